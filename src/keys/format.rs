/// Prefixes a credential must start with to be considered at all.
pub const KEY_PREFIXES: [&str; 3] = ["lgp_", "sk-", "ak-"];

/// Shortest credential accepted, in characters.
pub const MIN_KEY_LEN: usize = 20;

/// Cheap structural check run before any table lookup.
///
/// A candidate passes when it is at least `MIN_KEY_LEN` characters long,
/// starts with one of `KEY_PREFIXES` and contains only `[A-Za-z0-9_-]`.
pub fn validate_format(candidate: &str) -> bool {
    if candidate.chars().count() < MIN_KEY_LEN {
        return false;
    }
    if !KEY_PREFIXES.iter().any(|p| candidate.starts_with(p)) {
        return false;
    }
    candidate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Log-safe rendering of a secret. Never log the full key.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    } else {
        "****".to_string()
    }
}
