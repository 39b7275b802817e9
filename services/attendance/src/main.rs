use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use attendance::clock::{Clock, SystemClock};
use attendance::config::EngineConfig;
use attendance::coordinator::SignInCoordinator;
use attendance::display::{DisplayConfig, DisplaySurface, HttpDisplaySurface};
use attendance::metrics::{MetricsSink, PgMetricsSink};
use attendance::repository::{self, PgSessionRepository, SessionRepository};
use attendance::routes;
use attendance::scheduler::SessionScheduler;
use attendance::state::AppState;
use attendance::state_token::StateTokenRegistry;
use attendance::summary::SummaryViewSynchronizer;
use attendance::verification::{MemberDirectory, PgMemberDirectory, VerificationGate};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting attendance service");

    // Initialize database connection pool
    let db_config = common::database::DatabaseConfig::from_env()?;
    let pool = common::database::init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    repository::init_schema(&pool).await?;

    let engine_config = EngineConfig::from_env();
    let display_config = DisplayConfig::from_env()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repository: Arc<dyn SessionRepository> = Arc::new(PgSessionRepository::new(pool.clone()));
    let surface: Arc<dyn DisplaySurface> = Arc::new(HttpDisplaySurface::new(display_config));
    let synchronizer = Arc::new(SummaryViewSynchronizer::new(
        repository.clone(),
        surface,
        clock.clone(),
        engine_config.mention_budget,
    ));

    let pg_directory = Arc::new(PgMemberDirectory::new(pool.clone()));
    let gate: Arc<dyn VerificationGate> = pg_directory.clone();
    let directory: Arc<dyn MemberDirectory> = pg_directory;
    let metrics: Arc<dyn MetricsSink> = Arc::new(PgMetricsSink::new(pool.clone()));

    let coordinator = Arc::new(SignInCoordinator::new(
        repository.clone(),
        gate,
        synchronizer.clone(),
        metrics,
        clock.clone(),
        engine_config.require_verification,
    ));

    let scheduler = Arc::new(SessionScheduler::new(
        repository.clone(),
        synchronizer,
        clock.clone(),
        engine_config.recovery_window(),
    ));

    // Close out anything that expired while the process was down and
    // re-arm timers for still-open sessions
    scheduler.recover().await?;

    let registry = Arc::new(StateTokenRegistry::new(
        engine_config.state_token_ttl(),
        clock.clone(),
    ));

    let bind_addr = engine_config.bind_addr.clone();
    let app_state = AppState {
        config: engine_config,
        clock,
        repository,
        coordinator,
        scheduler,
        registry,
        directory,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Attendance service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
