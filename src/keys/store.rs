//! In-memory key table and request-time authentication.
//!
//! Lifecycle: built once at startup, read by every request, never shrunk.
//! Records sit in a plain `HashMap` that is immutable after construction, so
//! membership tests need no lock. `last_used` lives in a separate `DashMap`;
//! concurrent authentications against the same key may overwrite each other's
//! timestamp, which is acceptable for telemetry.

use std::collections::HashMap;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::format::{mask, validate_format};
use super::generator::{self, RoleSpec};
use crate::errors::AuthError;
use crate::models::api_key::{ApiKeyRecord, KeyUsage, DEFAULT_PERMISSIONS};
use crate::models::identity::AuthenticatedIdentity;

/// Header carrying the raw key. Checked before `Authorization`.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Where the table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Configured,
    /// Nothing usable was configured; secrets were generated at startup and
    /// are known only to this process.
    Fallback,
}

/// Records synthesized when no configuration is supplied:
/// (user id, role used for the key prefix, permissions).
const FALLBACK_USERS: [(&str, &str, &[&str]); 3] = [
    ("test-user", "test", &["read", "write"]),
    ("frontend-app", "frontend", &["read", "write"]),
    ("admin", "admin", &["read", "write", "admin"]),
];

pub struct KeyStore {
    records: HashMap<String, ApiKeyRecord>,
    last_used: DashMap<String, DateTime<Utc>>,
    source: KeySource,
}

impl KeyStore {
    /// Builds the table from an `API_KEYS`-style string, or generates the
    /// fallback set when the string is absent or yields no entries.
    pub fn load(raw: Option<&str>) -> Self {
        let entries = raw.map(parse_key_table).unwrap_or_default();
        if !entries.is_empty() {
            tracing::info!(count = entries.len(), "loaded API keys from configuration");
            return Self::with_source(entries, KeySource::Configured);
        }

        tracing::warn!(
            "no API keys configured; generated {} ephemeral fallback keys. \
             They are unknown to any client unless surfaced by the operator. \
             Set API_KEYS (see `keygate generate`) for stable keys.",
            FALLBACK_USERS.len()
        );
        Self::with_source(fallback_entries(), KeySource::Fallback)
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (String, ApiKeyRecord)>,
    {
        Self::with_source(records, KeySource::Configured)
    }

    fn with_source<I>(records: I, source: KeySource) -> Self
    where
        I: IntoIterator<Item = (String, ApiKeyRecord)>,
    {
        Self {
            records: records.into_iter().collect(),
            last_used: DashMap::new(),
            source,
        }
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    /// Number of accepted keys.
    pub fn key_count(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, secret: &str) -> Option<&ApiKeyRecord> {
        self.records.get(secret)
    }

    pub fn last_used(&self, secret: &str) -> Option<DateTime<Utc>> {
        self.last_used.get(secret).map(|t| *t)
    }

    /// Generated secrets, only in fallback mode, for one-time display to the
    /// operator. Sorted by user id.
    pub fn fallback_keys(&self) -> Vec<(&str, &str)> {
        if self.source != KeySource::Fallback {
            return Vec::new();
        }
        let mut keys: Vec<(&str, &str)> = self
            .records
            .iter()
            .map(|(secret, rec)| (rec.user_id.as_str(), secret.as_str()))
            .collect();
        keys.sort();
        keys
    }

    /// Verifies the credential carried by `headers`.
    ///
    /// Reads nothing but the table; the only write is the best-effort
    /// `last_used` stamp on success.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedIdentity, AuthError> {
        let candidate = extract_credential(headers)?;

        if !validate_format(&candidate) {
            tracing::warn!(key = %mask(&candidate), "rejected API key: bad format");
            return Err(AuthError::InvalidFormat);
        }

        let Some(record) = self.records.get(&candidate) else {
            tracing::warn!(key = %mask(&candidate), "rejected API key: not recognised");
            return Err(AuthError::UnknownCredential);
        };

        self.last_used.insert(candidate, Utc::now());
        tracing::debug!(user_id = %record.user_id, "authenticated API key");
        Ok(AuthenticatedIdentity::from(record))
    }

    /// Snapshot of every key with masked secrets, sorted by user id.
    pub fn usage(&self) -> Vec<KeyUsage> {
        let mut rows: Vec<KeyUsage> = self
            .records
            .iter()
            .map(|(secret, rec)| KeyUsage {
                key: mask(secret),
                user_id: rec.user_id.clone(),
                permissions: rec.permissions.clone(),
                created_at: rec.created_at,
                last_used: self.last_used(secret),
            })
            .collect();
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id).then_with(|| a.key.cmp(&b.key)));
        rows
    }
}

/// Pulls the candidate key out of the request headers.
///
/// `x-api-key` wins; otherwise `Authorization: Bearer <key>` (scheme matched
/// case-insensitively). Any other scheme counts as no credential.
pub fn extract_credential(headers: &HeaderMap) -> Result<String, AuthError> {
    if let Some(value) = headers.get(API_KEY_HEADER) {
        if !value.as_bytes().is_empty() {
            return decode(value.as_bytes()).map(str::to_string);
        }
    }

    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = decode(value.as_bytes())?;
        if let Some(token) = bearer_token(value) {
            return Ok(token.to_string());
        }
    }

    Err(AuthError::MissingCredential)
}

fn decode(raw: &[u8]) -> Result<&str, AuthError> {
    std::str::from_utf8(raw).map_err(|_| AuthError::MalformedCredential)
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, rest) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// Parses `secret:identity:cap|cap,secret:identity,...`.
///
/// Entries missing a secret or identity are skipped with a warning; a
/// partially broken table still loads. Missing capabilities default to
/// `read|write`. On duplicate secrets the last entry wins.
pub fn parse_key_table(raw: &str) -> Vec<(String, ApiKeyRecord)> {
    let mut entries: Vec<(String, ApiKeyRecord)> = Vec::new();

    for (idx, item) in raw.split(',').enumerate() {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }

        let mut parts = item.splitn(3, ':').map(str::trim);
        let secret = parts.next().unwrap_or_default();
        let identity = parts.next().unwrap_or_default();
        if secret.is_empty() || identity.is_empty() {
            tracing::warn!(entry = idx, "skipping malformed API key entry");
            continue;
        }

        let permissions = parse_permissions(parts.next().unwrap_or_default());

        if !validate_format(secret) {
            tracing::warn!(
                entry = idx,
                user_id = identity,
                key = %mask(secret),
                "configured API key does not match the key format and will never authenticate"
            );
        }

        if let Some(pos) = entries.iter().position(|(s, _)| s == secret) {
            tracing::warn!(entry = idx, key = %mask(secret), "duplicate API key; later entry wins");
            entries.remove(pos);
        }

        entries.push((secret.to_string(), ApiKeyRecord::new(identity, permissions)));
    }

    entries
}

fn parse_permissions(raw: &str) -> Vec<String> {
    let mut perms: Vec<String> = Vec::new();
    for p in raw.split('|').map(str::trim).filter(|p| !p.is_empty()) {
        if !perms.iter().any(|existing| existing == p) {
            perms.push(p.to_string());
        }
    }
    if perms.is_empty() {
        perms = DEFAULT_PERMISSIONS.iter().map(|p| p.to_string()).collect();
    }
    perms
}

fn fallback_entries() -> Vec<(String, ApiKeyRecord)> {
    FALLBACK_USERS
        .iter()
        .map(|(user_id, role, perms)| {
            let role = RoleSpec {
                name: role.to_string(),
                strength: generator::DEFAULT_STRENGTH,
            };
            let secret = generator::generate_for(&role);
            let perms = perms.iter().map(|p| p.to_string()).collect();
            (secret, ApiKeyRecord::new(*user_id, perms))
        })
        .collect()
}
