//! Offline key generator.
//!
//! Mints `lgp_<role>_<token>` keys from the OS CSPRNG and renders them as a
//! dotenv document whose `API_KEYS` line is exactly what `KeyStore::load`
//! consumes.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroize;

/// Prefix shared by every generated key.
pub const KEY_PREFIX: &str = "lgp";

/// Entropy used when a role does not specify one.
pub const DEFAULT_STRENGTH: usize = 32;

/// Below this the token stops being a meaningful secret.
pub const MIN_STRENGTH: usize = 16;

/// Entropy cap; keeps exported values at a sane length.
pub const MAX_STRENGTH: usize = 256;

/// File holding the real keys. Must never be committed.
pub const KEYS_FILE: &str = ".env.api_keys";

/// Redacted template safe to share.
pub const SAMPLE_FILE: &str = ".env.sample";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("invalid role name '{0}': start with a letter or '_', then use letters, digits, '_' or '-'")]
    InvalidRole(String),

    #[error("key strength must be between 16 and 256 bytes, got {0}")]
    InvalidStrength(usize),

    #[error("key strength '{0}' is not a number of bytes")]
    MalformedStrength(String),

    #[error("roles '{0}' and '{1}' both export {2}")]
    DuplicateEnvVar(String, String, String),
}

/// A named key consumer and the entropy its key gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub name: String,
    pub strength: usize,
}

impl RoleSpec {
    /// The name becomes part of a shell variable, so it must start with a
    /// letter or `_`.
    pub fn new(name: &str, strength: usize) -> Result<Self, GenerateError> {
        let name = name.trim().to_lowercase();
        let leads_ok = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !leads_ok
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(GenerateError::InvalidRole(name));
        }
        if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&strength) {
            return Err(GenerateError::InvalidStrength(strength));
        }
        Ok(Self { name, strength })
    }

    /// Identity bound to keys of this role.
    pub fn identity(&self) -> String {
        format!("{}-user", self.name)
    }

    pub fn permissions(&self) -> Vec<String> {
        let mut perms = vec!["read".to_string(), "write".to_string()];
        if self.name == "admin" {
            perms.push("admin".to_string());
        }
        perms
    }

    /// `TEST_API_KEY` for `test`, `CI_BOT_API_KEY` for `ci-bot`.
    pub fn env_var(&self) -> String {
        format!("{}_API_KEY", self.name.to_uppercase().replace('-', "_"))
    }
}

impl FromStr for RoleSpec {
    type Err = GenerateError;

    /// Parses `name` or `name:strength`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, strength)) => {
                let strength = strength
                    .trim()
                    .parse()
                    .map_err(|_| GenerateError::MalformedStrength(strength.trim().to_string()))?;
                RoleSpec::new(name, strength)
            }
            None => RoleSpec::new(s, DEFAULT_STRENGTH),
        }
    }
}

impl fmt::Display for RoleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.strength)
    }
}

/// Roles provisioned when the operator does not name any.
pub fn default_roles() -> Vec<RoleSpec> {
    [
        ("test", 24),
        ("frontend", 32),
        ("admin", 40),
        ("mobile", 28),
        ("webhook", 36),
    ]
    .into_iter()
    .map(|(name, strength)| RoleSpec {
        name: name.to_string(),
        strength,
    })
    .collect()
}

/// Produces `lgp_<role>_<token>` with `strength` bytes of OS entropy.
///
/// Every call draws fresh randomness; two calls never return the same value
/// except with negligible probability.
pub fn generate(role: &str, strength: usize) -> Result<String, GenerateError> {
    let spec = RoleSpec::new(role, strength)?;
    Ok(generate_for(&spec))
}

pub(crate) fn generate_for(spec: &RoleSpec) -> String {
    let mut random = vec![0u8; spec.strength];
    OsRng.fill_bytes(&mut random);
    let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&random);
    random.zeroize();
    format!("{}_{}_{}", KEY_PREFIX, spec.name, token)
}

/// A freshly minted key together with the grant it is exported with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    pub role: RoleSpec,
    pub secret: String,
    pub identity: String,
    pub permissions: Vec<String>,
}

/// Mints one key per role. Roles whose variables would collide in the
/// rendered document (`ci-bot` and `ci_bot`) are rejected up front.
pub fn generate_key_set(roles: &[RoleSpec]) -> Result<Vec<GeneratedKey>, GenerateError> {
    let mut seen: HashSet<String> = HashSet::new();
    for (idx, role) in roles.iter().enumerate() {
        let var = role.env_var();
        if !seen.insert(var.clone()) {
            let first = roles[..idx]
                .iter()
                .find(|r| r.env_var() == var)
                .map(|r| r.name.clone())
                .unwrap_or_default();
            return Err(GenerateError::DuplicateEnvVar(first, role.name.clone(), var));
        }
    }

    Ok(roles
        .iter()
        .map(|role| GeneratedKey {
            role: role.clone(),
            secret: generate_for(role),
            identity: role.identity(),
            permissions: role.permissions(),
        })
        .collect())
}

/// Body of the `API_KEYS` variable: `secret:identity:cap|cap,...`.
pub fn render_key_table(keys: &[GeneratedKey]) -> String {
    keys.iter()
        .map(|k| format!("{}:{}:{}", k.secret, k.identity, k.permissions.join("|")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Full dotenv document: one export per role plus the combined table.
pub fn render_config(keys: &[GeneratedKey], generated_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        "# API keys for the keygate authentication gate".to_string(),
        format!(
            "# Generated on: {}",
            generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ),
        String::new(),
    ];

    for key in keys {
        let var = key.role.env_var();
        lines.push(format!("# {}", var));
        lines.push(format!("export {}=\"{}\"", var, key.secret));
        lines.push(String::new());
    }

    lines.push("# Combined key table consumed by `keygate serve`".to_string());
    lines.push(format!("export API_KEYS=\"{}\"", render_key_table(keys)));

    let mut doc = lines.join("\n");
    doc.push('\n');
    doc
}

/// Shareable template with every secret replaced by a placeholder.
pub fn render_sample(roles: &[RoleSpec]) -> String {
    let mut lines = vec![
        "# Sample .env for keygate".to_string(),
        format!("# Copy the real keys from {} into .env", KEYS_FILE),
        String::new(),
        "# Server".to_string(),
        "KEYGATE_PORT=8080".to_string(),
        "# KEYGATE_CORS_ORIGIN=https://app.example.com".to_string(),
        "RUST_LOG=keygate=info,tower_http=info".to_string(),
        String::new(),
        format!("# API keys (copy from {})", KEYS_FILE),
    ];
    for role in roles {
        lines.push(format!("# {}={}_{}_...", role.env_var(), KEY_PREFIX, role.name));
    }
    lines.push(format!(
        "# API_KEYS={}_<role>_...:<identity>:read|write,...",
        KEY_PREFIX
    ));

    let mut doc = lines.join("\n");
    doc.push('\n');
    doc
}

/// Paths written by [`write_artifacts`].
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub keys_file: PathBuf,
    pub sample_file: PathBuf,
}

/// Writes the key document and the sample template into `dir`.
///
/// A failed write is an error, never a skip: an unwritten key set looks
/// provisioned but is not.
pub fn write_artifacts(
    dir: &Path,
    keys: &[GeneratedKey],
    generated_at: DateTime<Utc>,
) -> anyhow::Result<Artifacts> {
    let keys_file = dir.join(KEYS_FILE);
    let sample_file = dir.join(SAMPLE_FILE);

    std::fs::write(&keys_file, render_config(keys, generated_at))
        .with_context(|| format!("failed to write {}", keys_file.display()))?;
    tracing::info!(path = %keys_file.display(), count = keys.len(), "wrote API keys");

    let roles: Vec<RoleSpec> = keys.iter().map(|k| k.role.clone()).collect();
    std::fs::write(&sample_file, render_sample(&roles))
        .with_context(|| format!("failed to write {}", sample_file.display()))?;
    tracing::info!(path = %sample_file.display(), "wrote sample env template");

    Ok(Artifacts {
        keys_file,
        sample_file,
    })
}
