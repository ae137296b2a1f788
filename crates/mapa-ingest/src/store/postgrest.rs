//! PostgREST (Supabase) client for the application store

use super::{ApplicationStore, Filter, StoreError};
use crate::config::StoreConfig;
use async_trait::async_trait;
use mapa_common::types::Table;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, StoreError>;

/// Client for `{url}/rest/v1/{table}`
pub struct PostgrestClient {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PostgrestClient {
    /// Create a client; `api_key` is sent both as `apikey` and as the bearer token
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", api_key))?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.url, &config.api_key, Duration::from_secs(config.timeout_secs))
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}", self.base_url, table.as_str())
    }

    fn with_filters(request: RequestBuilder, filters: &[Filter]) -> RequestBuilder {
        let pairs: Vec<(String, String)> = filters.iter().map(Filter::query_pair).collect();
        request.query(&pairs)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| StoreError::Rejected {
        status: 0,
        message: format!("invalid header value: {}", e),
    })
}

#[async_trait]
impl ApplicationStore for PostgrestClient {
    async fn select(&self, table: Table, columns: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        debug!(table = %table, columns, filters = filters.len(), "Selecting rows");

        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", columns)]);
        let response = Self::check(Self::with_filters(request, filters).send().await?).await?;

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn insert(&self, table: Table, rows: &[Value]) -> Result<()> {
        debug!(table = %table, rows = rows.len(), "Inserting rows");

        let response = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, table: Table, patch: &Value, filters: &[Filter]) -> Result<usize> {
        debug!(table = %table, filters = filters.len(), "Updating rows");

        // Only the ids of the changed rows come back
        let request = self
            .client
            .patch(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&[("select", "id")])
            .json(patch);
        let response = Self::check(Self::with_filters(request, filters).send().await?).await?;

        let bytes = response.bytes().await?;
        let changed: Vec<Value> = serde_json::from_slice(&bytes)?;
        Ok(changed.len())
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<()> {
        debug!(table = %table, filters = filters.len(), "Deleting rows");

        let request = self.client.delete(self.table_url(table));
        Self::check(Self::with_filters(request, filters).send().await?).await?;
        Ok(())
    }
}
