use anyhow::Context;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use hotel_price_feed::api::create_router;
use hotel_price_feed::config::loader::AppConfig;
use hotel_price_feed::config::LoggingConfig;
use hotel_price_feed::core::PriceFeedCore;
use hotel_price_feed::observability::metrics::register_metrics;
use hotel_price_feed::utils::clock::SystemClock;
use hotel_price_feed::utils::task_supervisor::TaskSupervisor;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "default".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;
    init_tracing(&config.logging);
    register_metrics();

    let bind_addr = config.server.bind_addr.clone();
    let core = Arc::new(PriceFeedCore::new(config, Arc::new(SystemClock)).context("building price feed")?);

    let mut supervisor = TaskSupervisor::new();
    core.spawn_background_tasks(&mut supervisor);

    let app = create_router(core)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    tracing::info!("Hotel price feed listening on {}", bind_addr);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::pin!(server);

    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    loop {
        tokio::select! {
            result = &mut server => {
                result.context("serving HTTP")?;
                break;
            }
            _ = health.tick() => {
                // Failures are logged by the supervisor; the API keeps serving reads.
                let _ = supervisor.check_health();
            }
        }
    }

    supervisor.shutdown_all();
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    if logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
