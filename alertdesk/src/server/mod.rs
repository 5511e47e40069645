// HTTP server setup and routing
pub mod handlers;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use self::state::AppState;
use crate::desk::Desk;
use crate::ServiceError;

/// Origins allowed when `CORS_ORIGINS` is not set.
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

/// CORS layer for the operator UI. Unparseable origins are logged and dropped.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Create the router with every alert desk route and the CORS layer.
pub fn create_app(desk: Arc<Desk>, cors_origins: &[String]) -> Router {
    let state = AppState { desk };

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/entity/:name", get(handlers::entity_subgraph))
        .route("/alerts/:id", get(handlers::view_alert))
        .route("/alerts/:id/correlate", post(handlers::correlate_alert))
        .route("/alerts/:id/clear", post(handlers::clear_alert))
        .route("/alerts/:id/acknowledge", post(handlers::acknowledge_alert))
        .route("/alerts/:id/unacknowledge", post(handlers::unacknowledge_alert))
        .route("/alerts/:id/comment", post(handlers::comment_alert))
        .route("/alerts/:id/rca", get(handlers::rca_graph))
        .route("/alerts/:id/related-changes", get(handlers::related_changes))
        .layer(create_cors_layer(cors_origins))
        .with_state(state)
}

/// Serve `app` on `addr` until the process receives Ctrl-C.
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServiceError> {
    info!("Server listening on {}", addr);
    info!("- Entity subgraph: http://{}/entity/<name>", addr);
    info!("- Health endpoint: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::server(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| ServiceError::server(e.to_string()))
}
