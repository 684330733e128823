use api::auth::middleware::log_request;
use api::routes::routes;
use api::state::AppState;
use axum::{Router, middleware::from_fn};
use migration::{Migrator, MigratorTrait};
use std::{net::SocketAddr, time::Duration};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_appender::rolling;
use util::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::global().clone();
    let _log_guard = init_logging(&config);

    let db = db::connect(&config.database_path).await?;
    Migrator::up(&db, None).await?;

    let app_state = AppState::from_config(db, &config);

    spawn_session_housekeeping(
        app_state.clone(),
        Duration::from_secs(config.housekeeping_interval_seconds.max(1)),
        config.session_retention(),
    );

    let app = Router::new()
        .nest("/api", routes(app_state))
        .layer(from_fn(log_request))
        .layer(CorsLayer::very_permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        "Starting {} on http://{} (env = {}, uniqueness = {})",
        config.project_name, addr, config.env, config.uniqueness_policy
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn init_logging(config: &AppConfig) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", &config.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = config.log_to_stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
    });

    let env_filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("api=info,services=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}

/// Closes lapsed sessions and purges old terminated ones on a fixed period.
fn spawn_session_housekeeping(app_state: AppState, every: Duration, retention: chrono::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = app_state.sessions().reap_expired(retention).await {
                warn!(error = %e, "Session housekeeping failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
