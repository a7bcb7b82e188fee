//! Keygate: API key authentication gate for hosted agent services.
//!
//! Re-exports modules needed by the binary and by integration tests in `tests/`.

pub mod api;
pub mod config;
pub mod errors;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod state;
