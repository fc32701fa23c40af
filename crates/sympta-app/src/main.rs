//! Sympta application binary - composition root.
//!
//! Ties together all Sympta crates into a single executable:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Open SQLite storage and run migrations
//! 3. Wire the reasoning collaborators into the turn orchestrator
//! 4. Start the axum REST API server
//!
//! The free-text completion, symptom parsing, and diagnosis backends are
//! network services owned outside this repository; any implementation of
//! the `sympta-chat` collaborator traits plugs in below. Until one is
//! wired, the deterministic mocks keep the full fallback chain runnable:
//! every turn degrades to the apology answer.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use sympta_api::{routes, AppState};
use sympta_chat::collaborators::{MockCompletion, MockDiagnosis, MockParser};
use sympta_chat::TurnOrchestrator;
use sympta_core::config::SymptaConfig;
use sympta_storage::Database;

use cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing. Priority: RUST_LOG env > --log-level flag > "info".
    let log_level = args
        .resolve_log_level()
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Sympta v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = SymptaConfig::load_or_default(&config_file);
    config.general.port = args.resolve_port(config.general.port);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join(&config.storage.db_file);
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Reasoning backends. Swap the mocks for real collaborator
    // implementations here; credentials and endpoints belong to those
    // implementations, constructed once from their own settings.
    tracing::warn!(
        "No reasoning backends configured — wiring deterministic mocks; \
         every turn will fall through to the apology answer"
    );
    let orchestrator = TurnOrchestrator::new(
        Arc::new(MockCompletion::unavailable()),
        Arc::new(MockParser::detecting_nothing()),
        Arc::new(MockDiagnosis::finding_nothing()),
        &config.engine,
    );

    let state = AppState::new(config, db, orchestrator);

    // API server.
    routes::start_server(state).await?;

    Ok(())
}
