use std::sync::Arc;

use axum::{
    http::{HeaderName, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::keys::API_KEY_HEADER;
use crate::middleware::auth::require_api_key;
use crate::middleware::headers::{request_id, security_headers};
use crate::state::AppState;

pub mod handlers;

/// Full application router: health check, authenticated API, and the
/// response layers every route shares.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_origin.clone());

    Router::new()
        // Health endpoint (no auth)
        .route("/healthz", get(|| async { "ok" }))
        .nest("/api/v1", api_router(state.clone()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(security_headers))
}

/// Authenticated routes. All paths are relative; `app` mounts this under
/// `/api/v1`.
pub fn api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/whoami", get(handlers::whoami))
        .route("/keys", get(handlers::list_keys))
        .layer(middleware::from_fn_with_state(state, require_api_key))
        .fallback(fallback_404)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn cors_layer(extra_origin: Option<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let origin = origin.to_str().unwrap_or("");
            extra_origin.as_deref() == Some(origin)
                || origin.starts_with("http://localhost:")
                || origin.starts_with("http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static("x-request-id"),
        ])
}
