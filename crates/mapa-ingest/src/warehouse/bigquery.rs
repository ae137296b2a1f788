//! BigQuery implementation of [`Warehouse`] on `gcp-bigquery-client`
//!
//! A query is submitted with `jobs.query`; while the job is incomplete or the
//! response carries a page token, `jobs.getQueryResults` is polled for the
//! remaining rows. Every page is converted into typed [`Cell`]s using the
//! result schema.

use super::tabular::{Cell, Column, ColumnType, TabularResult};
use super::{Warehouse, WarehouseError};
use crate::config::{WarehouseConfig, WarehouseCredentials};
use async_trait::async_trait;
use gcp_bigquery_client::auth::Authenticator;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::get_query_results_response::GetQueryResultsResponse;
use gcp_bigquery_client::model::job_reference::JobReference;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::QueryResponse;
use gcp_bigquery_client::model::table_row::TableRow;
use gcp_bigquery_client::model::table_schema::TableSchema;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

type Result<T> = std::result::Result<T, WarehouseError>;

/// How long each `jobs.query` / `jobs.getQueryResults` call waits server-side
const SERVER_WAIT_MS: i32 = 10_000;

/// Pre-issued OAuth2 access token handed to the client as-is
#[derive(Clone)]
struct StaticToken(String);

#[async_trait]
impl Authenticator for StaticToken {
    async fn access_token(&self) -> std::result::Result<String, BQError> {
        Ok(self.0.clone())
    }
}

impl From<BQError> for WarehouseError {
    fn from(err: BQError) -> Self {
        match err {
            BQError::ResponseError { error } => WarehouseError::Api {
                status: u16::try_from(error.error.code).unwrap_or_default(),
                message: error.error.message,
            },
            other => WarehouseError::Client(other.to_string()),
        }
    }
}

/// One page of a query, whichever endpoint produced it
struct Page {
    complete: bool,
    job: Option<JobReference>,
    schema: Option<TableSchema>,
    rows: Vec<TableRow>,
    page_token: Option<String>,
}

impl From<QueryResponse> for Page {
    fn from(response: QueryResponse) -> Self {
        Self {
            complete: response.job_complete.unwrap_or(false),
            job: response.job_reference,
            schema: response.schema,
            rows: response.rows.unwrap_or_default(),
            page_token: response.page_token,
        }
    }
}

impl From<GetQueryResultsResponse> for Page {
    fn from(response: GetQueryResultsResponse) -> Self {
        Self {
            complete: response.job_complete.unwrap_or(false),
            job: response.job_reference,
            schema: response.schema,
            rows: response.rows.unwrap_or_default(),
            page_token: response.page_token,
        }
    }
}

/// BigQuery client bound to a billing project
pub struct BigQueryWarehouse {
    client: Client,
    billing_project: String,
}

impl std::fmt::Debug for BigQueryWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryWarehouse")
            .field("billing_project", &self.billing_project)
            .finish()
    }
}

impl BigQueryWarehouse {
    pub fn new(client: Client, billing_project: impl Into<String>) -> Self {
        Self {
            client,
            billing_project: billing_project.into(),
        }
    }

    /// Authenticate and build a client from configuration
    pub async fn connect(config: &WarehouseConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new();
        builder.with_v2_base_url(config.api_url.trim_end_matches('/').to_string());

        let client = match &config.credentials {
            WarehouseCredentials::AccessToken(token) => {
                let auth: Arc<dyn Authenticator> = Arc::new(StaticToken(token.clone()));
                builder.build_from_authenticator(auth).await?
            },
            WarehouseCredentials::KeyFile(path) => {
                let key = gcp_bigquery_client::yup_oauth2::read_service_account_key(path)
                    .await
                    .map_err(|e| {
                        WarehouseError::Auth(format!(
                            "cannot read service account key {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                builder
                    .build_from_service_account_key(key, true)
                    .await
                    .map_err(|e| WarehouseError::Auth(format!("cannot build authenticator: {}", e)))?
            },
        };

        Ok(Self::new(client, config.billing_project.clone()))
    }

    async fn submit(&self, query: &str) -> Result<Page> {
        let mut request = QueryRequest::new(query);
        request.timeout_ms = Some(SERVER_WAIT_MS);

        let response = self.client.job().query(&self.billing_project, request).await?;
        Ok(Page::from(response))
    }

    async fn poll(&self, job: &JobReference, page_token: Option<String>) -> Result<Page> {
        let job_id = job.job_id.as_deref().ok_or_else(|| {
            WarehouseError::Response("job reference without a job id".to_string())
        })?;
        let project_id = job.project_id.as_deref().unwrap_or(&self.billing_project);

        let parameters = GetQueryResultsParameters {
            location: job.location.clone(),
            page_token,
            timeout_ms: Some(SERVER_WAIT_MS),
            ..Default::default()
        };

        let response = self
            .client
            .job()
            .get_query_results(project_id, job_id, parameters)
            .await?;
        Ok(Page::from(response))
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn execute_query(&self, query: &str) -> Result<TabularResult> {
        let mut page = self.submit(query).await?;
        let mut columns: Option<Vec<Column>> = None;
        let mut rows: Vec<Vec<Cell>> = Vec::new();

        loop {
            if page.complete {
                if columns.is_none() {
                    columns = page.schema.as_ref().map(schema_columns);
                }
                if let Some(cols) = &columns {
                    for row in page.rows.drain(..) {
                        rows.push(convert_row(cols, row)?);
                    }
                }
            }

            if page.complete && page.page_token.is_none() {
                break;
            }

            let job = page.job.take().ok_or_else(|| {
                WarehouseError::Response("incomplete query response without a job reference".to_string())
            })?;
            let page_token = page.page_token.take();
            debug!(job_id = ?job.job_id, page = page_token.is_some(), "Fetching query results");
            page = self.poll(&job, page_token).await?;
            if page.job.is_none() {
                page.job = Some(job);
            }
        }

        Ok(TabularResult::new(columns.unwrap_or_default(), rows))
    }
}

fn schema_columns(schema: &TableSchema) -> Vec<Column> {
    schema
        .fields
        .iter()
        .flatten()
        .map(|field| {
            let type_name = serde_json::to_value(&field.r#type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            Column::new(field.name.clone(), ColumnType::from_bigquery(&type_name))
        })
        .collect()
}

fn convert_row(columns: &[Column], row: TableRow) -> Result<Vec<Cell>> {
    let cells = row.columns.unwrap_or_default();
    if cells.len() != columns.len() {
        return Err(WarehouseError::Response(format!(
            "row has {} cells, schema has {} columns",
            cells.len(),
            columns.len()
        )));
    }

    columns
        .iter()
        .zip(cells)
        .map(|(column, cell)| convert_cell(column, cell.value.unwrap_or(Value::Null)))
        .collect()
}

fn convert_cell(column: &Column, value: Value) -> Result<Cell> {
    let text = match value {
        Value::Null => return Ok(Cell::Null),
        Value::String(text) => text,
        other => other.to_string(),
    };

    let invalid = |kind: &str| {
        WarehouseError::Response(format!(
            "column '{}': '{}' is not a valid {}",
            column.name, text, kind
        ))
    };

    match column.column_type {
        ColumnType::Integer => text.parse().map(Cell::Integer).map_err(|_| invalid("integer")),
        ColumnType::Float => text.parse().map(Cell::Float).map_err(|_| invalid("number")),
        ColumnType::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" => Ok(Cell::Boolean(true)),
            "false" => Ok(Cell::Boolean(false)),
            _ => Err(invalid("boolean")),
        },
        ColumnType::Text => Ok(Cell::Text(text)),
    }
}
