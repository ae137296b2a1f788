//! Chunked, paced writes into the application store

use crate::error::{IngestError, Result};
use crate::store::{ApplicationStore, Filter};
use mapa_common::types::{LocalVotacao, Municipio, NovoCandidato, ResultadoZona, Table, VotosTotal};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A record the loader can insert and identify in logs
pub trait LoadRecord: Serialize {
    /// Natural or composite key, rendered for logs and errors
    fn record_key(&self) -> String;
}

impl LoadRecord for Municipio {
    fn record_key(&self) -> String {
        self.id_municipio.clone()
    }
}

impl LoadRecord for NovoCandidato {
    fn record_key(&self) -> String {
        self.key().to_string()
    }
}

impl LoadRecord for LocalVotacao {
    fn record_key(&self) -> String {
        format!("{}/{}/{}", self.ano, self.id_municipio, self.zona)
    }
}

impl LoadRecord for ResultadoZona {
    fn record_key(&self) -> String {
        format!("{}/{}/{}/{}", self.candidato_id, self.ano, self.id_municipio, self.zona)
    }
}

/// Outcome of the per-record totals update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub updated: usize,
    /// Accepted by the store but matched no stored candidate
    pub unmatched: usize,
    pub failed: usize,
}

/// Writes batches into the store in bounded chunks
#[derive(Clone)]
pub struct BatchLoader {
    store: Arc<dyn ApplicationStore>,
    pause: Duration,
}

impl BatchLoader {
    pub fn new(store: Arc<dyn ApplicationStore>, pause: Duration) -> Self {
        Self { store, pause }
    }

    /// Insert `records` in chunks of at most `chunk_size`, in order.
    ///
    /// The first rejected chunk aborts the load; chunks already sent stay in
    /// the store. Returns the number of records accepted.
    pub async fn load<T: LoadRecord>(&self, table: Table, records: &[T], chunk_size: usize) -> Result<usize> {
        if chunk_size == 0 {
            return Err(IngestError::config(format!(
                "chunk size for {} must be greater than 0",
                table
            )));
        }

        let chunks = records.len().div_ceil(chunk_size);
        info!(table = %table, records = records.len(), chunks, chunk_size, "Loading table");

        let mut accepted = 0;
        for (index, chunk) in records.chunks(chunk_size).enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            let rows = chunk
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<Value>, _>>()?;

            if let Err(source) = self.store.insert(table, &rows).await {
                let keys: Vec<String> = chunk.iter().map(LoadRecord::record_key).collect();
                let first_key = keys.first().cloned().unwrap_or_default();
                let last_key = keys.last().cloned().unwrap_or_default();
                error!(
                    table = %table,
                    chunk = index + 1,
                    chunks,
                    first_key = %first_key,
                    last_key = %last_key,
                    keys = ?keys,
                    error = %source,
                    "Chunk insert failed; remaining chunks skipped"
                );
                return Err(IngestError::LoadChunk {
                    table,
                    chunk: index + 1,
                    records: chunk.len(),
                    first_key,
                    last_key,
                    source,
                });
            }

            accepted += chunk.len();
            debug!(table = %table, chunk = index + 1, chunks, records = chunk.len(), "Chunk inserted");
        }

        info!(table = %table, accepted, "Table loaded");
        Ok(accepted)
    }

    /// Set `votos_total` on the candidates matching each total's sequence number.
    ///
    /// One update per record; a failed update is logged and the rest continue.
    pub async fn update_votos_totais(&self, totals: &[VotosTotal]) -> UpdateSummary {
        let mut summary = UpdateSummary::default();

        for total in totals {
            let patch = json!({ "votos_total": total.votos_total });
            let filter = [Filter::eq("sequencial", &total.sequencial_candidato)];

            match self.store.update(Table::Candidatos, &patch, &filter).await {
                Ok(0) => {
                    summary.unmatched += 1;
                    warn!(
                        sequencial = %total.sequencial_candidato,
                        votos_total = total.votos_total,
                        "Vote total matched no stored candidate"
                    );
                },
                Ok(_) => {
                    summary.updated += 1;
                    debug!(
                        sequencial = %total.sequencial_candidato,
                        votos_total = total.votos_total,
                        "Vote total updated"
                    );
                },
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        sequencial = %total.sequencial_candidato,
                        error = %e,
                        "Vote total update failed"
                    );
                },
            }
        }

        if summary.failed > 0 || summary.unmatched > 0 {
            warn!(
                updated = summary.updated,
                unmatched = summary.unmatched,
                failed = summary.failed,
                "Vote totals partially updated"
            );
        } else {
            info!(updated = summary.updated, "Vote totals updated");
        }
        summary
    }
}
