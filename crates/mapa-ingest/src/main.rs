//! Mapa Ingest - electoral data migration tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mapa_common::logging::{init_logging, LogConfig, LogLevel};
use mapa_ingest::config::MigrationConfig;
use mapa_ingest::inspect::DataInspector;
use mapa_ingest::orchestrator::{MigrationOrchestrator, MigrationReport};
use mapa_ingest::store::{ApplicationStore, PostgrestClient};
use mapa_ingest::warehouse::queries::QueryCatalog;
use mapa_ingest::warehouse::{BigQueryWarehouse, QueryGateway, Warehouse};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "mapa-ingest")]
#[command(author, version, about = "Migrate electoral data from BigQuery into the map database")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clear every table and migrate everything
    Full,

    /// Migrate zone results and update vote totals only
    Partial,

    /// Insert the polling locations of one year
    Locations {
        /// Election year
        #[arg(short, long)]
        year: i32,
    },

    /// Show what the database and the warehouse hold for one year
    Check {
        /// Election year
        #[arg(short, long)]
        year: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("mapa-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    if let Err(e) = run(cli.command).await {
        error!(error = %format!("{:#}", e), "mapa-ingest failed");
        return Err(e);
    }

    Ok(())
}

async fn run(command: Command) -> Result<()> {
    let config = MigrationConfig::from_env().context("invalid configuration")?;

    let warehouse: Arc<dyn Warehouse> = Arc::new(
        BigQueryWarehouse::connect(&config.warehouse)
            .await
            .context("cannot connect to BigQuery")?,
    );
    let store: Arc<dyn ApplicationStore> = Arc::new(
        PostgrestClient::from_config(&config.store).context("cannot create store client")?,
    );

    match command {
        Command::Full => {
            let mut orchestrator = MigrationOrchestrator::new(&config, warehouse, store);
            let report = orchestrator.run_full().await?;
            log_report(&report);
        },
        Command::Partial => {
            let mut orchestrator = MigrationOrchestrator::new(&config, warehouse, store);
            let report = orchestrator.run_partial().await?;
            log_report(&report);
        },
        Command::Locations { year } => {
            let mut orchestrator = MigrationOrchestrator::new(&config, warehouse, store);
            let report = orchestrator.load_locations_for_year(year).await?;
            log_report(&report);
        },
        Command::Check { year } => {
            let inspector = DataInspector::new(
                QueryGateway::new(warehouse),
                store,
                QueryCatalog::new(config.scope.clone()),
            );
            inspector.inspect_year(year).await?.log();
        },
    }

    Ok(())
}

fn log_report(report: &MigrationReport) {
    match serde_json::to_string(report) {
        Ok(json) => info!(report = %json, "Migration report"),
        Err(e) => error!(error = %e, "Cannot serialize migration report"),
    }
}
