// Key table records. The secret itself is the lookup key of the table and is
// never stored inside the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capabilities granted when a table entry omits them.
pub const DEFAULT_PERMISSIONS: [&str; 2] = ["read", "write"];

/// One issued API key. Immutable once the table is built; usage timestamps
/// live in the store's side table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub user_id: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ApiKeyRecord {
    pub fn new(user_id: impl Into<String>, permissions: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            permissions,
            created_at: Utc::now(),
        }
    }
}

/// Operator-facing view of a key: masked secret plus usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyUsage {
    pub key: String,
    pub user_id: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}
