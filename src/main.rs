mod api;
mod clock;
mod config;
mod engine;
mod error;
mod models;
mod observability;
mod realtime;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), error::QueueError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let day_clock = Arc::new(clock::SystemDayClock::new(config.utc_offset_minutes));
    let app_state = Arc::new(state::AppState::new(
        config.max_queue_number,
        config.reset_queue_daily,
        config.event_buffer_size,
        day_clock,
    ));

    let app = api::rest::router(app_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::QueueError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        max_queue_number = config.max_queue_number,
        reset_queue_daily = config.reset_queue_daily,
        "queue dispatch server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::QueueError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
