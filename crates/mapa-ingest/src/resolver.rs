//! Candidate reference resolution
//!
//! Maps warehouse natural keys to the ids the application store assigned.
//! Every call reads the current store state; nothing is cached.

use crate::error::{IngestError, Result};
use crate::store::{ApplicationStore, Filter};
use mapa_common::types::{CandidateKey, CandidatoRef, CandidatoSequencial, Table};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Reads candidate identities from the application store
#[derive(Clone)]
pub struct EntityResolver {
    store: Arc<dyn ApplicationStore>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    /// Index of `(sequencial, ano)` to store id over every stored candidate
    pub async fn resolve_candidate_ids(&self) -> Result<HashMap<CandidateKey, i64>> {
        let refs: Vec<CandidatoRef> =
            select_as(self.store.as_ref(), Table::Candidatos, "id,sequencial,ano", &[]).await?;

        let mut index = HashMap::with_capacity(refs.len());
        for candidato in refs {
            let key = CandidateKey::new(candidato.sequencial, candidato.ano);
            if let Some(previous) = index.insert(key.clone(), candidato.id) {
                warn!(
                    key = %key,
                    previous_id = previous,
                    id = candidato.id,
                    "Candidate key stored more than once; using the later id"
                );
            }
        }

        info!(candidates = index.len(), "Resolved candidate ids");
        Ok(index)
    }

    /// Distinct sequence numbers of every stored candidate
    pub async fn resolve_candidate_sequences(&self) -> Result<BTreeSet<String>> {
        let rows: Vec<CandidatoSequencial> =
            select_as(self.store.as_ref(), Table::Candidatos, "sequencial", &[]).await?;

        let sequences: BTreeSet<String> = rows.into_iter().map(|row| row.sequencial).collect();
        info!(candidates = sequences.len(), "Resolved candidate sequence numbers");
        Ok(sequences)
    }
}

/// Select rows from `table` and decode each as `T`
pub(crate) async fn select_as<T: DeserializeOwned>(
    store: &dyn ApplicationStore,
    table: Table,
    columns: &str,
    filters: &[Filter],
) -> Result<Vec<T>> {
    let rows = store
        .select(table, columns, filters)
        .await
        .map_err(|source| IngestError::Store {
            table,
            operation: "select",
            source,
        })?;

    rows.into_iter()
        .map(|row: Value| {
            serde_json::from_value(row)
                .map_err(|e| IngestError::decode(format!("{} row", table), e.to_string()))
        })
        .collect()
}
