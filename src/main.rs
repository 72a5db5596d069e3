//! # Retail API Main Entry Point
//!
//! `serve` (the default) migrates and starts the HTTP server, `migrate` only
//! applies pending migrations and `seed` inserts reference data.

use anyhow::Context;
use clap::{Parser, Subcommand};
use retail_api::{config::ConfigLoader, db, seeds, server::run_server, telemetry};

/// Retail / rental management REST API
#[derive(Parser, Debug)]
#[command(name = "retail-api", version)]
#[command(about = "Point of sale, inventory and rentals REST API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Apply pending migrations, then serve HTTP
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Insert the base currency and default warehouse when missing
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing telemetry")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            db::run_migrations(&db).await?;
            run_server(config, db).await
        }
        Command::Migrate => db::run_migrations(&db).await,
        Command::Seed => {
            let report = seeds::seed_reference_data(&db, &config).await?;
            tracing::info!(
                currencies = report.currencies,
                warehouses = report.warehouses,
                "Seeded reference data"
            );
            Ok(())
        }
    }
}
