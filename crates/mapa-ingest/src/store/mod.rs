//! Application store access
//!
//! [`ApplicationStore`] is the table-oriented CRUD seam the pipeline writes
//! through. Rows cross it as JSON objects; the typed records in
//! `mapa_common::types` serialize to exactly those objects.

pub mod postgrest;

pub use postgrest::PostgrestClient;

use async_trait::async_trait;
use mapa_common::types::Table;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Application store failure
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid JSON from store: {0}")]
    Body(#[from] serde_json::Error),
}

/// Comparison operator of a row filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gte => "gte",
        }
    }
}

/// A `column op value` row filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.to_string(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn neq(column: impl Into<String>, value: impl ToString) -> Self {
        Self::new(column, FilterOp::Neq, value)
    }

    pub fn gte(column: impl Into<String>, value: impl ToString) -> Self {
        Self::new(column, FilterOp::Gte, value)
    }

    /// PostgREST query pair: `column=op.value`
    pub fn query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op.as_str(), self.value))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}.{}", self.column, self.op.as_str(), self.value)
    }
}

/// Table-oriented CRUD over the application database
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Rows of `table` matching every filter, restricted to `columns`
    async fn select(&self, table: Table, columns: &str, filters: &[Filter]) -> Result<Vec<Value>, StoreError>;

    /// Insert `rows` in one request
    async fn insert(&self, table: Table, rows: &[Value]) -> Result<(), StoreError>;

    /// Apply `patch` to every row matching the filters; returns how many rows changed
    async fn update(&self, table: Table, patch: &Value, filters: &[Filter]) -> Result<usize, StoreError>;

    /// Delete every row matching the filters
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_rendering() {
        let filter = Filter::neq("id_municipio", 0);
        assert_eq!(filter.to_string(), "id_municipio=neq.0");
        assert_eq!(
            Filter::gte("id", 0).query_pair(),
            ("id".to_string(), "gte.0".to_string())
        );
    }
}
