//! Unit tests for the frequency controller

#[cfg(test)]
mod controller_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use platform::memory::MemoryKvStore;

    use crate::application::controller::FrequencyController;
    use crate::domain::entities::{EventKind, FrequencyConfig};
    use crate::error::FrequencyError;

    fn controller(store: &MemoryKvStore) -> FrequencyController<MemoryKvStore> {
        FrequencyController::new(Arc::new(store.clone()))
    }

    fn limits(impressions: u64, window: Duration) -> FrequencyConfig {
        FrequencyConfig {
            impression_limit: impressions,
            click_limit: 1,
            time_window: window,
            qps_limit: 10.0,
        }
    }

    #[tokio::test]
    async fn test_impression_cap_then_window_expiry() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);
        freq.update_config("s1", &limits(2, Duration::from_millis(100)))
            .await
            .unwrap();

        assert!(freq.check_impression("u1", "s1").await.unwrap());
        freq.record_impression("u1", "s1").await.unwrap();
        assert!(freq.check_impression("u1", "s1").await.unwrap());
        assert_eq!(freq.record_impression("u1", "s1").await.unwrap(), 2);
        assert!(!freq.check_impression("u1", "s1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(freq.check_impression("u1", "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_absent_counter_reads_as_zero() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);

        assert_eq!(freq.count(EventKind::Impression, "u1", "s1").await.unwrap(), 0);
        assert!(freq.check_impression("u1", "s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_defaults_apply_without_override() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);

        assert_eq!(freq.get_config("s9").await.unwrap(), FrequencyConfig::default());

        for _ in 0..3 {
            assert!(freq.check_click("u1", "s9").await.unwrap());
            freq.record_click("u1", "s9").await.unwrap();
        }
        // Default click limit is 3
        assert!(!freq.check_click("u1", "s9").await.unwrap());
        // Impressions are counted separately
        assert!(freq.check_impression("u1", "s9").await.unwrap());
    }

    #[tokio::test]
    async fn test_pairs_are_independent() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);
        freq.update_config("s1", &limits(1, Duration::from_secs(60)))
            .await
            .unwrap();

        freq.record_impression("u1", "s1").await.unwrap();
        assert!(!freq.check_impression("u1", "s1").await.unwrap());
        assert!(freq.check_impression("u2", "s1").await.unwrap());
        assert!(freq.check_impression("u1", "s2").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_and_not_stored() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);

        let mut bad = limits(0, Duration::from_secs(60));
        assert!(matches!(
            freq.update_config("s1", &bad).await,
            Err(FrequencyError::InvalidConfig(_))
        ));
        bad.impression_limit = 5;
        bad.qps_limit = 0.0;
        assert!(freq.update_config("s1", &bad).await.is_err());

        assert_eq!(freq.get_config("s1").await.unwrap(), FrequencyConfig::default());
    }

    #[tokio::test]
    async fn test_reset_config_restores_defaults() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);
        freq.update_config("s1", &limits(1, Duration::from_secs(60)))
            .await
            .unwrap();

        assert!(freq.reset_config("s1").await.unwrap());
        assert_eq!(freq.get_config("s1").await.unwrap().impression_limit, 10);
    }

    #[tokio::test]
    async fn test_corrupt_config_is_an_error() {
        use platform::kv::KvStore;

        let store = MemoryKvStore::new();
        store.set_value("freq:config:s1", "{oops", None).await.unwrap();
        let freq = controller(&store);

        assert!(matches!(
            freq.check_impression("u1", "s1").await,
            Err(FrequencyError::CorruptConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);
        store.set_offline(true);

        assert!(matches!(
            freq.check_impression("u1", "s1").await,
            Err(FrequencyError::Store(_))
        ));
        assert!(freq.record_impression("u1", "s1").await.is_err());
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);

        freq.record_impression("u1", "s1").await.unwrap();
        freq.record_impression("u1", "s1").await.unwrap();
        freq.record_click("u1", "s1").await.unwrap();

        let stats = freq.stats("u1", "s1").await.unwrap();
        assert_eq!(stats.impressions, 2);
        assert_eq!(stats.clicks, 1);

        freq.clear("u1", "s1").await.unwrap();
        let stats = freq.stats("u1", "s1").await.unwrap();
        assert_eq!((stats.impressions, stats.clicks), (0, 0));
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let store = MemoryKvStore::new();
        let freq = controller(&store);

        assert!(matches!(
            freq.check_impression("", "s1").await,
            Err(FrequencyError::InvalidUserId)
        ));
        assert!(matches!(
            freq.record_impression("u1", "").await,
            Err(FrequencyError::InvalidTargetId)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_not_lost() {
        let store = MemoryKvStore::new();
        let freq = Arc::new(controller(&store));

        let mut handles = Vec::new();
        for _ in 0..40 {
            let freq = freq.clone();
            handles.push(tokio::spawn(async move {
                freq.record_impression("u1", "s1").await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(freq.count(EventKind::Impression, "u1", "s1").await.unwrap(), 40);
    }
}

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use platform::memory::MemoryKvStore;
    use tower::ServiceExt;

    use crate::application::controller::FrequencyController;
    use crate::presentation::router::frequency_router;

    #[tokio::test]
    async fn test_put_then_get_config() {
        let controller = Arc::new(FrequencyController::new(Arc::new(MemoryKvStore::new())));
        let app = frequency_router(controller);

        let body = serde_json::json!({
            "impression_limit": 4,
            "click_limit": 2,
            "time_window_ms": 3_600_000,
            "qps_limit": 50.0
        });
        let response = app
            .clone()
            .oneshot(
                Request::put("/s1/config")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::get("/s1/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["targetId"], "s1");
        assert_eq!(json["config"]["impression_limit"], 4);

        let invalid = serde_json::json!({
            "impression_limit": 0,
            "click_limit": 2,
            "time_window_ms": 1000,
            "qps_limit": 1.0
        });
        let response = app
            .oneshot(
                Request::put("/s1/config")
                    .header("content-type", "application/json")
                    .body(Body::from(invalid.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
