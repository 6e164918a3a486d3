use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bridgit_api::config::ServerConfig;
use bridgit_api::router::build_app_router;
use bridgit_api::state::AppState;
use bridgit_core::config::BridgeConfig;
use bridgit_gef::api::GefApi;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bridgit_api=debug,bridgit_gef=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let bridge = BridgeConfig::from_file(&config.config_path)
        .unwrap_or_else(|e| panic!("Failed to load {}: {e}", config.config_path));
    let port = bridge.port().expect("PortNumber validated on load");
    tracing::info!(
        host = %config.host,
        port,
        gef = %bridge.gef_address,
        services = bridge.service_count(),
        "Loaded configuration",
    );

    // --- GEF client ---
    let gef = GefApi::new(&bridge.gef_address)
        .unwrap_or_else(|e| panic!("Invalid GEFAddress '{}': {e}", bridge.gef_address));

    // --- App state + router ---
    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST address"), port);
    let state = AppState::new(config, bridge, Arc::new(gef));
    let app = build_app_router(state);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
