use serde::{Deserialize, Serialize};

use super::api_key::ApiKeyRecord;

/// Result of a successful authentication, handed to the host layer.
///
/// `is_authenticated` is always `true` on values produced by the store;
/// failures are reported as `AuthError` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub identity: String,
    pub is_authenticated: bool,
    pub permissions: Vec<String>,
}

impl From<&ApiKeyRecord> for AuthenticatedIdentity {
    fn from(record: &ApiKeyRecord) -> Self {
        Self {
            identity: record.user_id.clone(),
            is_authenticated: true,
            permissions: record.permissions.clone(),
        }
    }
}
