//! Warehouse query gateway
//!
//! [`Warehouse`] is the transport seam: it takes a complete query string and
//! returns a [`TabularResult`]. [`QueryGateway`] wraps a warehouse with the
//! pipeline's error policy (log, wrap as `QueryExecution`, return) and typed
//! decoding through [`FromRow`].
//!
//! There is no retry and no completion timeout at this layer.

pub mod bigquery;
pub mod queries;
pub mod rows;
mod tabular;

pub use bigquery::BigQueryWarehouse;
pub use tabular::{Cell, Column, ColumnType, FromRow, RowRef, TabularResult};

use crate::error::{IngestError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Transport-level warehouse failure
#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("Warehouse client error: {0}")]
    Client(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Warehouse API responded {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed warehouse response: {0}")]
    Response(String),
}

/// Executes fully formed query strings against an analytical warehouse
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn execute_query(&self, query: &str) -> std::result::Result<TabularResult, WarehouseError>;
}

/// Query entry point used by the pipeline
#[derive(Clone)]
pub struct QueryGateway {
    warehouse: Arc<dyn Warehouse>,
}

impl QueryGateway {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    /// Run `query`, logging the outcome. `label` names the query in logs and errors.
    pub async fn execute_query(&self, label: &str, query: &str) -> Result<TabularResult> {
        info!(query = label, "Executing warehouse query");

        match self.warehouse.execute_query(query).await {
            Ok(result) => {
                info!(query = label, rows = result.len(), "Warehouse query succeeded");
                Ok(result)
            },
            Err(source) => {
                error!(query = label, error = %source, "Warehouse query failed");
                Err(IngestError::QueryExecution {
                    query: label.to_string(),
                    source,
                })
            },
        }
    }

    /// Run `query` and decode every row as `T`
    pub async fn fetch<T: FromRow>(&self, label: &str, query: &str) -> Result<Vec<T>> {
        self.execute_query(label, query).await?.decode()
    }
}
