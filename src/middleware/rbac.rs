use std::fmt;

use crate::errors::AppError;
use crate::models::identity::AuthenticatedIdentity;

/// Capability tags understood by the gate's own endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Admin,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag-based check. `admin` and `*` grant everything; any other tag grants
/// only itself.
pub fn check_permission(permissions: &[String], required: Permission) -> bool {
    permissions
        .iter()
        .any(|p| p == "*" || p == "admin" || p == required.as_str())
}

/// Returns 403 when `identity` lacks `required`.
pub fn enforce(identity: &AuthenticatedIdentity, required: Permission) -> Result<(), AppError> {
    if check_permission(&identity.permissions, required) {
        return Ok(());
    }
    tracing::warn!(
        user_id = %identity.identity,
        required = %required,
        "access denied: missing permission"
    );
    Err(AppError::Forbidden {
        required: required.to_string(),
    })
}

// ── Tests ───────────────────────────────────────────────────────
