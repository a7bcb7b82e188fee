use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keygate::keys::{self, generator, KeySource};
use keygate::state::AppState;
use keygate::{api, config};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(port).await,
        Some(cli::Commands::Generate { out_dir, roles }) => handle_generate(out_dir, roles),
        Some(cli::Commands::Check { key }) => handle_check(&key),
        None => run_server(None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// `RUST_LOG` drives the filter; `KEYGATE_LOG_FORMAT=json` switches to
/// structured output for log shippers.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "keygate=debug,tower_http=debug".into()),
    );
    let json = std::env::var("KEYGATE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_server(port_override: Option<u16>) -> anyhow::Result<()> {
    let cfg = config::load()?;
    let port = port_override.unwrap_or(cfg.port);

    tracing::info!("Loading API keys...");
    let state = Arc::new(AppState::new(cfg));

    if state.keys.source() == KeySource::Fallback {
        // Shown once on the operator's console, never through the log pipeline.
        eprintln!("⚠️  No API_KEYS configured. Ephemeral keys for this process only:");
        for (user_id, secret) in state.keys.fallback_keys() {
            eprintln!("   {:<14} {}", user_id, secret);
        }
        eprintln!("   Run `keygate generate` and set API_KEYS for stable keys.");
    }

    let app = api::app(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(keys = state.keys.key_count(), "keygate listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn handle_generate(out_dir: std::path::PathBuf, roles: Vec<keys::RoleSpec>) -> anyhow::Result<()> {
    let roles = if roles.is_empty() {
        generator::default_roles()
    } else {
        roles
    };

    println!("Generating {} API keys...", roles.len());
    let generated = generator::generate_key_set(&roles)?;

    println!();
    println!("{:<12} {}", "ROLE", "KEY");
    for key in &generated {
        println!("{:<12} {}", key.role.name.to_uppercase(), key.secret);
    }

    let artifacts = generator::write_artifacts(&out_dir, &generated, Utc::now())
        .context("API keys were NOT saved")?;

    println!();
    println!("Keys saved to {}", artifacts.keys_file.display());
    println!("Sample template saved to {}", artifacts.sample_file.display());
    println!("Keep {} out of version control.", generator::KEYS_FILE);
    println!();
    println!("Next steps:");
    println!("  1. Copy {} into .env (or export API_KEYS in your deployment)", generator::KEYS_FILE);
    println!("  2. Restart `keygate serve` to load the new keys");
    println!("  3. Call the API with `x-api-key: <key>` or `Authorization: Bearer <key>`");
    Ok(())
}

fn handle_check(key: &str) -> anyhow::Result<()> {
    if keys::validate_format(key) {
        println!("{}: well-formed", keys::mask(key));
        Ok(())
    } else {
        anyhow::bail!(
            "key is malformed: need at least {} characters, a prefix of {:?}, and only [A-Za-z0-9_-]",
            keys::MIN_KEY_LEN,
            keys::KEY_PREFIXES
        )
    }
}
