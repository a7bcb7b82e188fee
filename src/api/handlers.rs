use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::keys::KeySource;
use crate::middleware::rbac::{self, Permission};
use crate::models::api_key::KeyUsage;
use crate::models::identity::AuthenticatedIdentity;
use crate::state::AppState;

/// GET /api/v1/whoami returns the identity bound to the presented key
pub async fn whoami(
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<Json<AuthenticatedIdentity>, AppError> {
    rbac::enforce(&identity, Permission::Read)?;
    Ok(Json(identity))
}

#[derive(Debug, Serialize)]
pub struct KeyListResponse {
    pub source: &'static str,
    pub keys: Vec<KeyUsage>,
}

/// GET /api/v1/keys: masked key table with usage (admin only)
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<Json<KeyListResponse>, AppError> {
    rbac::enforce(&identity, Permission::Admin)?;

    let source = match state.keys.source() {
        KeySource::Configured => "configured",
        KeySource::Fallback => "fallback",
    };
    Ok(Json(KeyListResponse {
        source,
        keys: state.keys.usage(),
    }))
}
