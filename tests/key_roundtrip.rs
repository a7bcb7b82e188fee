//! Generator ↔ key store contract.
//!
//! Whatever `render_config` writes, `KeyStore::load` must read back as the
//! same table, and every generated key must authenticate.

use std::collections::HashSet;

use axum::http::{HeaderMap, HeaderValue};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;

use keygate::keys::generator::{self, GeneratedKey, RoleSpec};
use keygate::keys::{validate_format, KeyStore};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-_";
const CAPABILITIES: [&str; 6] = ["read", "write", "admin", "billing", "threads", "runs"];

fn random_word(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| *ALPHABET.choose(rng).unwrap() as char)
        .collect()
}

const LEADING: &[u8] = b"abcdefghijklmnopqrstuvwxyz_";

fn random_roles(rng: &mut impl Rng) -> Vec<RoleSpec> {
    let count = rng.gen_range(1..8);
    let mut vars = HashSet::new();
    let mut roles = Vec::new();
    while roles.len() < count {
        let lead = *LEADING.choose(rng).unwrap() as char;
        let tail_len = rng.gen_range(0..10);
        let name = format!("{}{}", lead, random_word(rng, tail_len));
        let strength = rng.gen_range(generator::MIN_STRENGTH..=48);
        let role = RoleSpec::new(&name, strength).unwrap();
        if vars.insert(role.env_var()) {
            roles.push(role);
        }
    }
    roles
}

fn random_key_set(rng: &mut impl Rng) -> Vec<GeneratedKey> {
    random_roles(rng)
        .into_iter()
        .enumerate()
        .map(|(i, role)| {
            let secret = generator::generate(&role.name, role.strength).unwrap();
            let n_caps = rng.gen_range(1..=CAPABILITIES.len());
            let permissions = CAPABILITIES
                .choose_multiple(rng, n_caps)
                .map(|c| c.to_string())
                .collect();
            GeneratedKey {
                identity: format!("{}-{}", random_word(rng, 6), i),
                role,
                secret,
                permissions,
            }
        })
        .collect()
}

/// Reads `API_KEYS` back out of a rendered document the same way a dotenv
/// loader would.
fn api_keys_from(doc: &str) -> String {
    dotenvy::from_read_iter(doc.as_bytes())
        .map(|item| item.unwrap())
        .find(|(k, _)| k == "API_KEYS")
        .map(|(_, v)| v)
        .unwrap()
}

fn key_header(secret: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", HeaderValue::from_str(secret).unwrap());
    headers
}

#[test]
fn test_render_then_load_reproduces_table() {
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let keys = random_key_set(&mut rng);
        let doc = generator::render_config(&keys, Utc::now());
        let store = KeyStore::load(Some(&api_keys_from(&doc)));

        assert_eq!(store.key_count(), keys.len());
        for key in &keys {
            let record = store.get(&key.secret).unwrap();
            assert_eq!(record.user_id, key.identity);
            let want: HashSet<&String> = key.permissions.iter().collect();
            let got: HashSet<&String> = record.permissions.iter().collect();
            assert_eq!(got, want);
        }
    }
}

#[test]
fn test_every_generated_key_authenticates() {
    let keys = generator::generate_key_set(&generator::default_roles()).unwrap();
    let table = generator::render_key_table(&keys);
    let store = KeyStore::load(Some(&table));

    for key in &keys {
        assert!(validate_format(&key.secret));
        let id = store.authenticate(&key_header(&key.secret)).unwrap();
        assert_eq!(id.identity, key.identity);
        assert_eq!(id.permissions, key.permissions);
        assert!(id.is_authenticated);
    }
}

#[test]
fn test_written_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let keys = generator::generate_key_set(&generator::default_roles()).unwrap();
    let artifacts = generator::write_artifacts(dir.path(), &keys, Utc::now()).unwrap();

    let doc = std::fs::read_to_string(&artifacts.keys_file).unwrap();
    let store = KeyStore::load(Some(&api_keys_from(&doc)));
    assert_eq!(store.key_count(), 5);

    let per_role: Vec<(String, String)> = dotenvy::from_read_iter(doc.as_bytes())
        .map(|item| item.unwrap())
        .filter(|(k, _)| k != "API_KEYS")
        .collect();
    assert_eq!(per_role.len(), 5);
    for (var, secret) in per_role {
        assert!(var.ends_with("_API_KEY"));
        assert!(store.get(&secret).is_some(), "{} not loaded", var);
    }
}
