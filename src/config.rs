use anyhow::Context;

/// Port used when `KEYGATE_PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub port: u16,
    /// Key table in `secret:identity:cap|cap,...` form. `None` when unset or
    /// blank, which puts the key store into fallback mode.
    pub api_keys: Option<String>,
    /// Extra browser origin allowed by CORS besides localhost.
    pub cors_origin: Option<String>,
}

/// Loads `.env` (if any) and resolves settings from the process environment.
pub fn load() -> anyhow::Result<Config> {
    check_dotenv(dotenvy::dotenv())?;
    from_source(|name| std::env::var(name).ok())
}

/// A missing `.env` is fine. One that exists but cannot be read or parsed is
/// a startup error: silently skipping it would drop `API_KEYS` and put the
/// key store into fallback mode.
pub fn check_dotenv<T>(result: dotenvy::Result<T>) -> anyhow::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => {
            tracing::debug!("no .env file found; using process environment only");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("failed to load .env file")),
    }
}

/// Resolves settings through `lookup`, which maps a variable name to its value.
pub fn from_source<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let port = match non_blank("KEYGATE_PORT") {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("KEYGATE_PORT is not a valid port: '{}'", raw))?,
        None => DEFAULT_PORT,
    };

    Ok(Config {
        port,
        api_keys: non_blank("API_KEYS"),
        cors_origin: non_blank("KEYGATE_CORS_ORIGIN"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        from_source(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = resolve(&[]).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert!(cfg.api_keys.is_none());
        assert!(cfg.cors_origin.is_none());
    }

    #[test]
    fn test_values() {
        let cfg = resolve(&[
            ("KEYGATE_PORT", " 9000 "),
            ("API_KEYS", "k1:alice"),
            ("KEYGATE_CORS_ORIGIN", "https://app.example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.api_keys.as_deref(), Some("k1:alice"));
        assert_eq!(cfg.cors_origin.as_deref(), Some("https://app.example.com"));
    }

    #[test]
    fn test_blank_api_keys_is_unset() {
        let cfg = resolve(&[("API_KEYS", "   ")]).unwrap();
        assert!(cfg.api_keys.is_none());
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let result = dotenvy::from_path(dir.path().join(".env"));
        assert!(check_dotenv(result).is_ok());
    }

    #[test]
    fn test_malformed_dotenv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "export 2FA_API_KEY=\"lgp_2fa_AAAAAAAAAAAAAAAAAAAAAAAA\"\n\
             export API_KEYS=\"lgp_2fa_AAAAAAAAAAAAAAAAAAAAAAAA:2fa-user:read\"\n",
        )
        .unwrap();

        let err = check_dotenv(dotenvy::from_path(&path)).unwrap_err();
        assert!(err.to_string().contains(".env"));
    }

    #[test]
    fn test_bad_port_is_an_error() {
        let err = resolve(&[("KEYGATE_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("KEYGATE_PORT"));
        assert!(resolve(&[("KEYGATE_PORT", "70000")]).is_err());
    }
}
