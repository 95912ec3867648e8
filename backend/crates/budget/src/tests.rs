//! Unit tests for the budget ledger

#[cfg(test)]
mod manager_tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use kernel::money::MinorUnits;
    use platform::kv::KvStore;
    use platform::memory::MemoryKvStore;

    use crate::application::config::BudgetConfig;
    use crate::application::manager::BudgetManager;
    use crate::domain::entities::{Budget, BudgetState};
    use crate::domain::services::spent_key;
    use crate::error::BudgetError;

    fn today(id: &str, cap_major: f64) -> Budget {
        Budget::daily(id, MinorUnits::from_major(cap_major), Utc::now().date_naive())
    }

    fn manager(store: &MemoryKvStore, config: BudgetConfig) -> BudgetManager<MemoryKvStore> {
        BudgetManager::new(Arc::new(store.clone()), Arc::new(config))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deductions_sum_exactly() {
        let store = MemoryKvStore::new();
        let ledger = Arc::new(manager(&store, BudgetConfig::default()));
        ledger.add_budget(today("b1", 1_000.0)).unwrap();

        let mut handles = Vec::new();
        for i in 0..50 {
            let ledger = ledger.clone();
            let amount = if i % 2 == 0 { 1.25 } else { 0.75 };
            handles.push(tokio::spawn(async move {
                ledger.check_and_deduct("b1", amount).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        // 25 × 1.25 + 25 × 0.75
        let expected = MinorUnits::new(5_000);
        assert_eq!(ledger.get_budget("b1").unwrap().spent, expected);
        assert_eq!(
            store.get_counter(&spent_key("b1")).await.unwrap(),
            Some(expected.get())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_strict_cap_is_never_exceeded() {
        let store = MemoryKvStore::new();
        let ledger = Arc::new(manager(&store, BudgetConfig::default()));
        ledger.add_budget(today("b1", 10.0)).unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.check_and_deduct("b1", 1.0).await.unwrap()
            }));
        }
        let mut committed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                committed += 1;
            }
        }

        assert_eq!(committed, 10);
        let status = ledger.get_budget_status("b1").unwrap();
        assert_eq!(status.spent, 10.0);
        assert!(status.is_exceeded);
        assert_eq!(status.remaining, 0.0);
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_false() {
        let store = MemoryKvStore::new();
        let ledger = manager(&store, BudgetConfig::default());
        ledger
            .add_budget(today("b1", 10.0).with_spent(MinorUnits::from_major(10.0)))
            .unwrap();

        assert!(!ledger.check_and_deduct("b1", 0.5).await.unwrap());
        // Nothing reached the shared counter
        assert_eq!(store.get_counter(&spent_key("b1")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_snapshot_rejects_before_store() {
        let store = MemoryKvStore::new();
        let ledger = manager(&store, BudgetConfig::optimistic());
        ledger.add_budget(today("b1", 10.0)).unwrap();

        assert!(ledger.check_and_deduct("b1", 6.0).await.unwrap());
        assert!(!ledger.check_and_deduct("b1", 6.0).await.unwrap());
        assert!(ledger.check_and_deduct("b1", 4.0).await.unwrap());
        assert_eq!(ledger.get_budget("b1").unwrap().spent, MinorUnits::new(1_000));
    }

    #[tokio::test]
    async fn test_cross_instance_strict_vs_optimistic() {
        // Two instances share the store; neither sees the other's local snapshot.
        let store = MemoryKvStore::new();
        let a = manager(&store, BudgetConfig::default());
        let b = manager(&store, BudgetConfig::default());
        a.add_budget(today("b1", 10.0)).unwrap();
        b.add_budget(today("b1", 10.0)).unwrap();

        assert!(a.check_and_deduct("b1", 8.0).await.unwrap());
        assert!(!b.check_and_deduct("b1", 8.0).await.unwrap());

        let store = MemoryKvStore::new();
        let a = manager(&store, BudgetConfig::optimistic());
        let b = manager(&store, BudgetConfig::optimistic());
        a.add_budget(today("b1", 10.0)).unwrap();
        b.add_budget(today("b1", 10.0)).unwrap();

        assert!(a.check_and_deduct("b1", 8.0).await.unwrap());
        // Bounded overshoot: b's snapshot still says 0 spent
        assert!(b.check_and_deduct("b1", 8.0).await.unwrap());
        assert_eq!(b.get_budget("b1").unwrap().spent, MinorUnits::new(1_600));
    }

    #[tokio::test]
    async fn test_hydrate_pulls_shared_spend() {
        let store = MemoryKvStore::new();
        let a = manager(&store, BudgetConfig::default());
        a.add_budget(today("b1", 10.0)).unwrap();
        assert!(a.check_and_deduct("b1", 3.0).await.unwrap());

        let b = manager(&store, BudgetConfig::default());
        b.add_budget(today("b1", 10.0)).unwrap();
        assert_eq!(b.hydrate("b1").await.unwrap(), MinorUnits::new(300));
        assert!(matches!(
            b.hydrate("missing").await,
            Err(BudgetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_is_idempotent() {
        let store = MemoryKvStore::new();
        let ledger = manager(&store, BudgetConfig::default());
        ledger.add_budget(today("b1", 10.0)).unwrap();
        assert!(ledger.check_and_deduct("b1", 2.5).await.unwrap());

        let first = ledger.get_budget_status("b1").unwrap();
        let second = ledger.get_budget_status("b1").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.spent, 2.5);
        assert_eq!(first.remaining, 7.5);
        assert!(first.is_active);
        assert!(!first.is_expired);
    }

    #[tokio::test]
    async fn test_rejections_are_errors() {
        let store = MemoryKvStore::new();
        let ledger = manager(&store, BudgetConfig::default());

        assert!(matches!(
            ledger.check_and_deduct("missing", 1.0).await,
            Err(BudgetError::NotFound(_))
        ));

        ledger
            .add_budget(today("off", 10.0).with_state(BudgetState::Inactive))
            .unwrap();
        assert!(matches!(
            ledger.check_and_deduct("off", 1.0).await,
            Err(BudgetError::Inactive(_))
        ));

        let now = Utc::now();
        ledger
            .add_budget(Budget::total(
                "old",
                MinorUnits::new(1_000),
                now - Duration::days(2),
                now - Duration::days(1),
            ))
            .unwrap();
        assert!(matches!(
            ledger.check_and_deduct("old", 1.0).await,
            Err(BudgetError::Expired(_))
        ));

        ledger
            .add_budget(Budget::total(
                "future",
                MinorUnits::new(1_000),
                now + Duration::days(1),
                now + Duration::days(2),
            ))
            .unwrap();
        assert!(matches!(
            ledger.check_and_deduct("future", 1.0).await,
            Err(BudgetError::Expired(_))
        ));

        ledger.add_budget(today("b1", 10.0)).unwrap();
        assert!(matches!(
            ledger.check_and_deduct("b1", 0.0).await,
            Err(BudgetError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.check_and_deduct("b1", -3.0).await,
            Err(BudgetError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_commits_nothing() {
        let store = MemoryKvStore::new();
        let ledger = manager(&store, BudgetConfig::default());
        ledger.add_budget(today("b1", 10.0)).unwrap();

        store.set_offline(true);
        assert!(matches!(
            ledger.check_and_deduct("b1", 1.0).await,
            Err(BudgetError::Store(_))
        ));
        store.set_offline(false);

        assert_eq!(ledger.get_budget("b1").unwrap().spent, MinorUnits::ZERO);
    }

    #[test]
    fn test_add_update_remove() {
        let store = MemoryKvStore::new();
        let ledger = manager(&store, BudgetConfig::default());

        ledger.add_budget(today("b1", 10.0)).unwrap();
        assert!(matches!(
            ledger.add_budget(today("b1", 20.0)),
            Err(BudgetError::AlreadyExists(_))
        ));
        assert!(matches!(
            ledger.update_budget(today("b2", 20.0)),
            Err(BudgetError::NotFound(_))
        ));
        assert!(matches!(
            ledger.add_budget(today("b3", 0.0)),
            Err(BudgetError::InvalidAmount(_))
        ));

        let now = Utc::now();
        assert!(matches!(
            ledger.add_budget(Budget::total("b4", MinorUnits::new(1), now, now)),
            Err(BudgetError::InvalidWindow)
        ));

        // Supplied spend never rolls the ledger back
        ledger
            .update_budget(today("b1", 20.0).with_description("raised"))
            .unwrap();
        let updated = ledger.get_budget("b1").unwrap();
        assert_eq!(updated.cap, MinorUnits::new(2_000));
        assert_eq!(updated.description, "raised");

        assert_eq!(ledger.list_budgets().len(), 1);
        ledger.remove_budget("b1").unwrap();
        assert!(ledger.list_budgets().is_empty());
        assert!(matches!(
            ledger.remove_budget("b1"),
            Err(BudgetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_roll_over_daily_starts_a_fresh_day() {
        let store = MemoryKvStore::new();
        let ledger = manager(&store, BudgetConfig::default());
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let cap = MinorUnits::from_major(5.0);
        ledger
            .add_budget(
                Budget::daily("b1", cap, yesterday)
                    .with_spent(cap)
                    .with_description("spent out"),
            )
            .unwrap();

        assert!(matches!(
            ledger.check_and_deduct("b1", 1.0).await,
            Err(BudgetError::Expired(_))
        ));

        assert!(ledger.roll_over_daily("b1").unwrap());
        let rolled = ledger.get_budget("b1").unwrap();
        assert_eq!(rolled.start_time.date_naive(), Utc::now().date_naive());
        assert_eq!(rolled.spent, MinorUnits::ZERO);
        assert_eq!(rolled.cap, cap);
        assert_eq!(rolled.description, "spent out");

        // Already current
        assert!(!ledger.roll_over_daily("b1").unwrap());
        assert!(ledger.check_and_deduct("b1", 1.0).await.unwrap());

        let now = Utc::now();
        ledger
            .add_budget(Budget::total("t1", cap, now - Duration::days(3), now - Duration::days(1)))
            .unwrap();
        assert!(!ledger.roll_over_daily("t1").unwrap());
    }
}

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use platform::memory::MemoryKvStore;
    use tower::ServiceExt;

    use crate::application::config::BudgetConfig;
    use crate::application::manager::BudgetManager;
    use crate::presentation::router::budget_router;

    fn app() -> axum::Router {
        let manager = Arc::new(BudgetManager::new(
            Arc::new(MemoryKvStore::new()),
            Arc::new(BudgetConfig::default()),
        ));
        budget_router(manager)
    }

    #[tokio::test]
    async fn test_create_then_status() {
        let app = app();
        let now = chrono::Utc::now();
        let body = serde_json::json!({
            "id": "camp-1",
            "type": "total",
            "amount": 25.5,
            "startTime": (now - chrono::Duration::hours(1)).to_rfc3339(),
            "endTime": (now + chrono::Duration::hours(1)).to_rfc3339(),
        });

        let response = app
            .clone()
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(Request::get("/camp-1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let status: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(status["budget_id"], "camp-1");
        assert_eq!(status["amount"], 25.5);
        assert_eq!(status["is_active"], true);
    }

    #[tokio::test]
    async fn test_unknown_budget_is_404_and_bad_type_is_400() {
        let app = app();

        let response = app
            .clone()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let now = chrono::Utc::now();
        let body = serde_json::json!({
            "id": "camp-2",
            "type": "weekly",
            "amount": 1.0,
            "startTime": now.to_rfc3339(),
            "endTime": (now + chrono::Duration::hours(1)).to_rfc3339(),
        });
        let response = app
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
