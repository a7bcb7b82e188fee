//! API key lifecycle: format contract, generation, storage and
//! request-time authentication.

pub mod format;
pub mod generator;
pub mod store;

pub use format::{mask, validate_format, KEY_PREFIXES, MIN_KEY_LEN};
pub use generator::{generate, GenerateError, GeneratedKey, RoleSpec};
pub use store::{KeySource, KeyStore, API_KEY_HEADER};
