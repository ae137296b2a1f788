//! Mapa Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Moves electoral data from the public BigQuery datasets into the
//! application's Supabase (PostgREST) database.
//!
//! # Pipeline
//!
//! - **Warehouse**: query texts, BigQuery client, typed row decoding
//! - **Resolver**: `(sequencial, ano)` to stored candidate id
//! - **Reconcile**: drop orphan and duplicate zone results
//! - **Loader**: chunked, paced inserts and per-record total updates
//! - **Orchestrator**: full, partial and single-year runs
//! - **Inspect**: read-only per-year checks
//!
//! # Example
//!
//! ```no_run
//! use mapa_ingest::config::MigrationConfig;
//! use mapa_ingest::orchestrator::MigrationOrchestrator;
//! use mapa_ingest::store::PostgrestClient;
//! use mapa_ingest::warehouse::BigQueryWarehouse;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MigrationConfig::from_env()?;
//!     let warehouse = BigQueryWarehouse::connect(&config.warehouse).await?;
//!     let store = PostgrestClient::from_config(&config.store)?;
//!
//!     let mut orchestrator =
//!         MigrationOrchestrator::new(&config, Arc::new(warehouse), Arc::new(store));
//!     let report = orchestrator.run_partial().await?;
//!     println!("{} zone results loaded", report.resultados_zona);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod inspect;
pub mod loader;
pub mod orchestrator;
pub mod reconcile;
pub mod relevant;
pub mod resolver;
pub mod store;
pub mod warehouse;

pub use error::{IngestError, Result};
