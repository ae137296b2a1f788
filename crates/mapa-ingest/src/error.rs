//! Error types for the migration pipeline
//!
//! Every failure names the table, query or stage it came from, so the final
//! message printed at the process boundary identifies where a run stopped.

use crate::orchestrator::MigrationStage;
use crate::store::StoreError;
use crate::warehouse::WarehouseError;
use mapa_common::types::Table;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Pipeline error type
#[derive(Error, Debug)]
pub enum IngestError {
    /// The warehouse rejected the query or could not be reached
    #[error("Warehouse query '{query}' failed: {source}")]
    QueryExecution {
        query: String,
        #[source]
        source: WarehouseError,
    },

    /// One chunk of a batch insert was rejected; later chunks were not sent
    #[error(
        "Insert into {table} failed at chunk {chunk} ({records} records, keys {first_key}..{last_key}): {source}"
    )]
    LoadChunk {
        table: Table,
        chunk: usize,
        records: usize,
        first_key: String,
        last_key: String,
        #[source]
        source: StoreError,
    },

    /// A read, update or delete against the application store failed
    #[error("{operation} on {table} failed: {source}")]
    Store {
        table: Table,
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// Missing or malformed process configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A warehouse or store row did not match the expected shape
    #[error("Cannot decode {record}: {message}")]
    Decode { record: String, message: String },

    /// A value could not be safely inlined into a query
    #[error("Invalid query parameter: {0}")]
    InvalidQueryParameter(String),

    /// The relevant candidate list could not be read
    #[error("Candidate list {}: {message}", .path.display())]
    CandidateList { path: PathBuf, message: String },

    /// A migration stage failed; the run stopped there
    #[error("Migration failed during {stage}: {source}")]
    Stage {
        stage: MigrationStage,
        #[source]
        source: Box<IngestError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngestError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a decode error for the given record type
    pub fn decode(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Stage at which a run failed, if this error came out of the orchestrator
    pub fn failed_stage(&self) -> Option<MigrationStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
