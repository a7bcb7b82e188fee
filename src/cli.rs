use std::path::PathBuf;

use clap::{Parser, Subcommand};

use keygate::keys::RoleSpec;

/// Keygate: API key gate and key generator for hosted agent services
#[derive(Parser)]
#[command(name = "keygate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the authentication gate
    Serve {
        /// Port to bind (overrides KEYGATE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate API keys and write them as a dotenv file
    Generate {
        /// Directory receiving .env.api_keys and .env.sample
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Role to mint a key for, as NAME or NAME:BYTES (repeatable).
        /// Defaults to test, frontend, admin, mobile and webhook.
        #[arg(short, long = "role")]
        roles: Vec<RoleSpec>,
    },

    /// Check whether a key is well-formed
    Check {
        key: String,
    },
}
