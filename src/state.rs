use crate::config::Config;
use crate::keys::KeyStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub keys: KeyStore,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let keys = KeyStore::load(config.api_keys.as_deref());
        Self { keys, config }
    }
}
