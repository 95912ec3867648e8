//! API Server Entry Point
//!
//! Wires the bidding core onto PostgreSQL and serves it.
//! Uses `anyhow` for startup errors; request-path errors are the context
//! error types, rendered through `kernel::error::AppError`.

mod configs;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, http,
    http::{Method, header},
};
use bidding::{
    BiddingEngine, BudgetGate, EngineConfig, HttpTargetingClient, PgStrategyRepository,
    StaticTargeting, StrategyFilter, StrategyRepository, TargetingService, TrafficConfig,
    TrafficService, bid_router, strategy_router,
};
use budget::{BudgetConfig, BudgetManager, budget_router};
use frequency::{FrequencyController, frequency_router};
use platform::config::{ConfigService, env_opt, env_or};
use platform::postgres::PgKvStore;
use platform::rate_limit::{RateLimitConfig, SlidingWindowLimiter};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::configs::config_router;

/// How often every enabled strategy's ledger entry is rebuilt
const BUDGET_RESYNC_INTERVAL: Duration = Duration::from_secs(60);

type Ledger = BudgetManager<PgKvStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,bidding=info,budget=info,frequency=info,platform=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env_opt("DATABASE_URL")
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set in environment"))?;

    let pool = PgPoolOptions::new()
        .max_connections(env_or("DATABASE_MAX_CONNECTIONS", 10u32)?)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Startup cleanup: drop expired shared-store rows
    // Errors here should not prevent server startup
    let store = PgKvStore::new(pool.clone());
    if let Err(e) = store.cleanup_expired().await {
        tracing::warn!(error = %e, "Store cleanup failed, continuing anyway");
    }

    // Runtime configuration
    let engine_config = Arc::new(EngineConfig {
        max_concurrent_bids: env_or("MAX_CONCURRENT_BIDS", EngineConfig::default().max_concurrent_bids)?,
        ..EngineConfig::default()
    });
    let traffic_config = Arc::new(TrafficConfig {
        bid_timeout: Duration::from_millis(env_or("BID_TIMEOUT_MS", 200u64)?),
        max_ad_slots: env_or("MAX_AD_SLOTS", TrafficConfig::default().max_ad_slots)?,
        rate_limit: RateLimitConfig::per_second(env_or("TRAFFIC_QPS", 1000.0f64)?),
    });
    let budget_config = Arc::new(BudgetConfig {
        strict_cap: env_or("BUDGET_STRICT_CAP", true)?,
        ..BudgetConfig::default()
    });

    // Core services
    let repo = Arc::new(PgStrategyRepository::new(pool.clone()));
    let ledger: Arc<Ledger> = Arc::new(BudgetManager::new(Arc::new(store.clone()), budget_config));
    let frequency = Arc::new(FrequencyController::new(Arc::new(store.clone())));
    let config_service = Arc::new(ConfigService::new(store.clone()));

    // Seed the ledger before taking traffic
    let seeded = sync_budgets(repo.as_ref(), ledger.as_ref(), engine_config.page_size).await?;
    tracing::info!(strategies = seeded, "Budgets seeded");
    spawn_budget_resync(repo.clone(), ledger.clone(), engine_config.page_size);

    let engine = Arc::new(BiddingEngine::new(
        repo.clone(),
        ledger.clone(),
        frequency.clone(),
        engine_config,
    ));
    let limiter = Arc::new(SlidingWindowLimiter::new(store.clone(), "ratelimit:bid"));

    let core = Core {
        repo,
        ledger,
        frequency,
        config_service,
    };

    // Targeting: without a base URL every user is targeted
    let app = match env_opt("RTA_BASE_URL") {
        Some(base_url) => {
            let timeout = Duration::from_millis(env_or("RTA_TIMEOUT_MS", 100u64)?);
            let client = HttpTargetingClient::new(&base_url, timeout)?;
            tracing::info!(base_url = %base_url, "Targeting enabled");
            core.router(engine, Arc::new(client), limiter, traffic_config)
        }
        None => {
            tracing::warn!("RTA_BASE_URL not set, targeting disabled");
            core.router(engine, Arc::new(StaticTargeting(true)), limiter, traffic_config)
        }
    };

    // CORS configuration
    let frontend_origins = env_opt("FRONTEND_ORIGINS")
        .unwrap_or_else(|| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]));

    let app = app.layer(TraceLayer::new_for_http()).layer(cors);

    // Start server
    let addr: SocketAddr = env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 31113)))?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Services shared by every route group
struct Core {
    repo: Arc<PgStrategyRepository>,
    ledger: Arc<Ledger>,
    frequency: Arc<FrequencyController<PgKvStore>>,
    config_service: Arc<ConfigService<PgKvStore>>,
}

impl Core {
    fn router<T>(
        self,
        engine: Arc<BiddingEngine<PgStrategyRepository, Ledger, FrequencyController<PgKvStore>>>,
        targeting: Arc<T>,
        limiter: Arc<SlidingWindowLimiter<PgKvStore>>,
        traffic_config: Arc<TrafficConfig>,
    ) -> Router
    where
        T: TargetingService + Send + Sync + 'static,
    {
        let traffic = Arc::new(TrafficService::new(engine, targeting, limiter, traffic_config));

        Router::new()
            .nest("/api/v1/bid", bid_router(traffic))
            .nest("/api/v1/strategies", strategy_router(self.repo, self.ledger.clone()))
            .nest("/api/v1/budgets", budget_router(self.ledger))
            .nest("/api/v1/frequency", frequency_router(self.frequency))
            .nest("/api/v1/configs", config_router(self.config_service))
    }
}

/// Rebuild the ledger entry of every enabled strategy, page by page.
///
/// Returns the number of strategies synced.
async fn sync_budgets<R, B>(repo: &R, ledger: &B, page_size: u32) -> anyhow::Result<usize>
where
    R: StrategyRepository + Sync,
    B: BudgetGate + Sync,
{
    let mut filter = StrategyFilter::active(page_size).normalized();
    let mut synced = 0;
    loop {
        let (page, _) = repo.list(&filter).await?;
        for strategy in &page {
            if let Err(e) = ledger.sync_strategy(strategy).await {
                tracing::warn!(strategy_id = strategy.id, error = %e, "Failed to sync strategy budget");
                continue;
            }
            synced += 1;
        }
        if page.len() < filter.page_size as usize {
            break;
        }
        filter.page += 1;
    }
    Ok(synced)
}

/// Periodic resync: repairs missed admin syncs and rolls daily budgets
/// over at UTC midnight
fn spawn_budget_resync(repo: Arc<PgStrategyRepository>, ledger: Arc<Ledger>, page_size: u32) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(BUDGET_RESYNC_INTERVAL);
        // The first tick completes immediately; startup already synced
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sync_budgets(repo.as_ref(), ledger.as_ref(), page_size).await {
                Ok(synced) => tracing::debug!(strategies = synced, "Budgets resynced"),
                Err(e) => tracing::warn!(error = %e, "Budget resync failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
