use crate::server::SignalServer;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;

use super::admin::{admin_rooms_handler, admin_users_handler, metrics_handler};
use super::handler::websocket_handler;

/// Create the Axum router with WebSocket support
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<SignalServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    // Parse CORS origins
    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/health", get(health_check))
        .route("/v1/ws", get(websocket_handler))
        .route("/v1/admin/rooms", get(admin_rooms_handler))
        .route("/v1/admin/users", get(admin_users_handler))
        .route("/v1/metrics", get(metrics_handler))
        .fallback(|| async { "Session signal server. Connect via WebSocket at /v1/ws." })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Serve `server` on `addr` until the listener fails. Spawns the room
/// maintenance task alongside.
pub async fn run_server(
    addr: SocketAddr,
    server: Arc<SignalServer>,
    cors_origins: &str,
) -> anyhow::Result<()> {
    let cleanup_server = Arc::clone(&server);
    tokio::spawn(async move {
        cleanup_server.cleanup_task().await;
    });

    let app = create_router(cors_origins).with_state(server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        %cors_origins,
        "Server started over HTTP - WebSocket: /v1/ws, Admin: /v1/admin, Metrics: /v1/metrics"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
