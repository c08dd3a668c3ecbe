//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, rate limiting, and
//! all endpoint handlers. Registration, login, and the health probe
//! are public; everything else sits behind bearer-token auth.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use devdesk_core::config::DevDeskConfig;
use devdesk_core::error::DevDeskError;

use crate::handlers;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS: allow localhost origins for a local dashboard.
    let port = state.config.general.port;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            [
                format!("http://127.0.0.1:{}", port),
                format!("http://localhost:{}", port),
            ]
            .iter()
            .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(crate::auth::register))
        .route("/login", post(crate::auth::login));

    let limiter = RateLimiter::new(state.config.general.rate_limit_per_sec);

    let protected_routes = Router::new()
        .route("/chat", post(handlers::chat))
        .route("/feedback", post(handlers::feedback))
        .route(
            "/conversation/history/{user}",
            get(handlers::conversation_history),
        )
        .route(
            "/conversation/stats/{user}",
            get(handlers::conversation_stats),
        )
        .route("/observability/logs", get(handlers::observability_logs))
        .route("/employees", get(handlers::employees))
        .route("/tickets", get(handlers::tickets))
        .route("/deployments", get(handlers::deployments))
        .layer(axum::middleware::from_fn(
            crate::rate_limit::rate_limit_middleware,
        ))
        .layer(axum::Extension(limiter))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(64 * 1024)) // 64KB request bodies
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Binds to 127.0.0.1 (localhost only) on the port from config.
pub async fn start_server(config: &DevDeskConfig, state: AppState) -> Result<(), DevDeskError> {
    let addr = format!("127.0.0.1:{}", config.general.port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DevDeskError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| DevDeskError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
