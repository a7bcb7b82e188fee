use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::state::AppState;

/// Middleware: authenticates the request against the key store and stores
/// the resulting `AuthenticatedIdentity` in the request extensions.
///
/// Rejections are rendered as 401 with a JSON error body.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = state.keys.authenticate(req.headers()).map_err(|e| {
        tracing::debug!(
            method = %req.method(),
            path = %req.uri().path(),
            code = e.code(),
            "request rejected"
        );
        e
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
