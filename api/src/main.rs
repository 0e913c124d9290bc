use std::net::SocketAddr;

use pollmcp_api::config::ServerConfig;
use pollmcp_api::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pollmcp_api=debug,pollmcp_runtime=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = ServerConfig::from_env();
    let state = AppState::new(&config);
    let app = pollmcp_api::build_router(state.clone(), &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        lease_timeout_ms = config.dispatch.lease_timeout.as_millis() as u64,
        sweep_interval_ms = config.dispatch.sweep_interval.as_millis() as u64,
        internal_routes = config.enable_internal_routes,
        "pollmcp server listening on {}",
        addr
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, "failed to bind {}", addr);
            std::process::exit(1);
        }
    };

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    state.shutdown().await;

    if let Err(err) = served {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
