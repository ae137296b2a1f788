//! Shared fakes for the pipeline integration tests
//!
//! - [`FakeWarehouse`] answers queries with canned results, chosen by a
//!   substring of the query text, and records every query it ran.
//! - [`InMemoryStore`] keeps table rows as JSON objects, assigns `id`s,
//!   applies PostgREST-style filters and can be told to reject requests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use mapa_common::types::Table;
use mapa_ingest::config::MigrationConfig;
use mapa_ingest::store::{ApplicationStore, Filter, FilterOp, StoreError};
use mapa_ingest::warehouse::{Cell, Column, ColumnType, TabularResult, Warehouse, WarehouseError};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// ============================================================================
// Warehouse
// ============================================================================

#[derive(Default)]
pub struct FakeWarehouse {
    responses: Vec<(String, TabularResult)>,
    failures: Vec<String>,
    executed: Mutex<Vec<String>>,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `needle` with `result`; later registrations win
    pub fn with(mut self, needle: &str, result: TabularResult) -> Self {
        self.responses.insert(0, (needle.to_string(), result));
        self
    }

    /// Fail queries containing `needle`
    pub fn failing(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.executed().iter().filter(|q| q.contains(needle)).count()
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn execute_query(&self, query: &str) -> Result<TabularResult, WarehouseError> {
        self.executed.lock().unwrap().push(query.to_string());

        if self.failures.iter().any(|needle| query.contains(needle.as_str())) {
            return Err(WarehouseError::Api {
                status: 403,
                message: "Access Denied".to_string(),
            });
        }

        self.responses
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, result)| result.clone())
            .ok_or_else(|| WarehouseError::Response(format!("no canned result for: {}", query)))
    }
}

// ============================================================================
// Warehouse result builders
// ============================================================================

pub const MUNICIPIOS: &str = "br_bd_diretorios_brasil.municipio";
pub const CANDIDATOS: &str = "br_tse_eleicoes.candidatos";
pub const LOCAIS: &str = "AVG(ST_Y(melhor_urbano))";
pub const RESULTADOS: &str = "sequencial_candidato, ano, id_municipio, zona, votos";
pub const TOTAIS: &str = "SUM(votos)";

pub fn tabular(columns: &[(&str, ColumnType)], rows: Vec<Vec<Cell>>) -> TabularResult {
    TabularResult::new(
        columns.iter().map(|(name, ty)| Column::new(*name, *ty)).collect(),
        rows,
    )
}

pub fn municipios_result(rows: &[(&str, &str)]) -> TabularResult {
    tabular(
        &[
            ("id_municipio", ColumnType::Text),
            ("nome", ColumnType::Text),
            ("sigla_uf", ColumnType::Text),
        ],
        rows.iter()
            .map(|(id, nome)| vec![(*id).into(), (*nome).into(), "RJ".into()])
            .collect(),
    )
}

/// `(nome_urna, sequencial, ano)`
pub fn candidatos_result(rows: &[(&str, &str, i64)]) -> TabularResult {
    tabular(
        &[
            ("nome_urna", ColumnType::Text),
            ("numero", ColumnType::Text),
            ("ano", ColumnType::Integer),
            ("cargo", ColumnType::Text),
            ("partido", ColumnType::Text),
            ("sequencial", ColumnType::Text),
            ("resultado", ColumnType::Text),
        ],
        rows.iter()
            .map(|(nome, seq, ano)| {
                vec![
                    (*nome).into(),
                    "50123".into(),
                    Cell::Integer(*ano),
                    "vereador".into(),
                    "PSOL".into(),
                    (*seq).into(),
                    "eleito".into(),
                ]
            })
            .collect(),
    )
}

/// `(ano, id_municipio, zona, latitude, longitude)`
pub fn locais_result(rows: &[(i64, &str, &str, f64, f64)]) -> TabularResult {
    tabular(
        &[
            ("ano", ColumnType::Integer),
            ("id_municipio", ColumnType::Text),
            ("zona", ColumnType::Text),
            ("latitude", ColumnType::Float),
            ("longitude", ColumnType::Float),
        ],
        rows.iter()
            .map(|(ano, municipio, zona, lat, lon)| {
                vec![
                    Cell::Integer(*ano),
                    (*municipio).into(),
                    (*zona).into(),
                    Cell::Float(*lat),
                    Cell::Float(*lon),
                ]
            })
            .collect(),
    )
}

/// `(sequencial_candidato, ano, id_municipio, zona, votos)`
pub fn resultados_result(rows: &[(&str, i64, &str, &str, i64)]) -> TabularResult {
    tabular(
        &[
            ("sequencial_candidato", ColumnType::Text),
            ("ano", ColumnType::Integer),
            ("id_municipio", ColumnType::Text),
            ("zona", ColumnType::Text),
            ("votos", ColumnType::Integer),
        ],
        rows.iter()
            .map(|(seq, ano, municipio, zona, votos)| {
                vec![
                    (*seq).into(),
                    Cell::Integer(*ano),
                    (*municipio).into(),
                    (*zona).into(),
                    Cell::Integer(*votos),
                ]
            })
            .collect(),
    )
}

/// `(sequencial_candidato, votos_total)`
pub fn totals_result(rows: &[(&str, i64)]) -> TabularResult {
    tabular(
        &[
            ("sequencial_candidato", ColumnType::Text),
            ("votos_total", ColumnType::Integer),
        ],
        rows.iter()
            .map(|(seq, total)| vec![(*seq).into(), Cell::Integer(*total)])
            .collect(),
    )
}

// ============================================================================
// Application store
// ============================================================================

#[derive(Default)]
struct StoreState {
    tables: HashMap<Table, Vec<Value>>,
    next_id: i64,
    insert_calls: Vec<(Table, usize)>,
    insert_attempts: HashMap<Table, usize>,
    fail_insert: Option<(Table, usize)>,
    fail_update_for: HashSet<String>,
    deletes: Vec<Table>,
    updates: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.state.lock().unwrap().next_id = 1;
        store
    }

    /// Seed `table` with `rows` as stored (ids included)
    pub fn with_rows(self, table: Table, rows: Vec<Value>) -> Self {
        self.state.lock().unwrap().tables.insert(table, rows);
        self
    }

    /// Reject the `attempt`-th insert (1-based) into `table`
    pub fn fail_insert_on(self, table: Table, attempt: usize) -> Self {
        self.state.lock().unwrap().fail_insert = Some((table, attempt));
        self
    }

    /// Reject updates filtered on this `sequencial`
    pub fn fail_update_for(self, sequencial: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_update_for
            .insert(sequencial.to_string());
        self
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Every insert request as `(table, records)`, rejected ones included
    pub fn insert_calls(&self) -> Vec<(Table, usize)> {
        self.state.lock().unwrap().insert_calls.clone()
    }

    pub fn deletes(&self) -> Vec<Table> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn update_calls(&self) -> usize {
        self.state.lock().unwrap().updates
    }
}

fn rejected(message: &str) -> StoreError {
    StoreError::Rejected {
        status: 400,
        message: message.to_string(),
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let Some(value) = row.get(&filter.column).and_then(render) else {
            return false;
        };
        match filter.op {
            FilterOp::Eq => value == filter.value,
            FilterOp::Neq => value != filter.value,
            FilterOp::Gte => match (value.parse::<f64>(), filter.value.parse::<f64>()) {
                (Ok(a), Ok(b)) => a >= b,
                _ => value >= filter.value,
            },
        }
    })
}

fn project(row: &Value, columns: &str) -> Value {
    if columns == "*" {
        return row.clone();
    }
    let mut out = Map::new();
    for column in columns.split(',').map(str::trim) {
        if let Some(value) = row.get(column) {
            out.insert(column.to_string(), value.clone());
        }
    }
    Value::Object(out)
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn select(&self, table: Table, columns: &str, filters: &[Filter]) -> Result<Vec<Value>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, filters))
                    .map(|row| project(row, columns))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, rows: &[Value]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls.push((table, rows.len()));
        let attempt = {
            let counter = state.insert_attempts.entry(table).or_insert(0);
            *counter += 1;
            *counter
        };
        if state.fail_insert == Some((table, attempt)) {
            return Err(rejected("insert rejected"));
        }

        for row in rows {
            let mut row = row.clone();
            if table != Table::Municipios && row.get("id").is_none() {
                let id = state.next_id;
                state.next_id += 1;
                if let Value::Object(map) = &mut row {
                    map.insert("id".to_string(), json!(id));
                }
            }
            state.tables.entry(table).or_default().push(row);
        }
        Ok(())
    }

    async fn update(&self, table: Table, patch: &Value, filters: &[Filter]) -> Result<usize, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.updates += 1;

        let blocked = filters
            .iter()
            .any(|f| f.column == "sequencial" && state.fail_update_for.contains(&f.value));
        if blocked {
            return Err(rejected("update rejected"));
        }

        let mut changed = 0;
        if let (Some(rows), Value::Object(patch)) = (state.tables.get_mut(&table), patch) {
            for row in rows.iter_mut().filter(|row| matches(row, filters)) {
                if let Value::Object(map) = row {
                    for (key, value) in patch {
                        map.insert(key.clone(), value.clone());
                    }
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.deletes.push(table);
        if let Some(rows) = state.tables.get_mut(&table) {
            rows.retain(|row| !matches(row, filters));
        }
        Ok(())
    }
}

// ============================================================================
// Configuration and fixtures
// ============================================================================

/// Candidate list file with a `nome_urna` column
pub fn candidates_csv(names: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "nome_urna,cargo").unwrap();
    for name in names {
        writeln!(file, "{},vereador", name).unwrap();
    }
    file.flush().unwrap();
    file
}

/// Configuration with no pacing between chunks
pub fn test_config(csv: &Path) -> MigrationConfig {
    let csv = csv.display().to_string();
    MigrationConfig::from_lookup(move |key| {
        let value = match key {
            "SUPABASE_URL" => "http://localhost:54321",
            "SUPABASE_SERVICE_KEY" => "service-key",
            "BIGQUERY_ACCESS_TOKEN" => "token",
            "MAPA_BATCH_PAUSE_MS" => "0",
            "MAPA_CANDIDATES_CSV" => csv.as_str(),
            _ => return None,
        };
        Some(value.to_string())
    })
    .unwrap()
}
