//! Reconciliation of warehouse zone results with stored candidate ids
//!
//! Rows whose candidate is not in the index are orphans and are dropped.
//! Of several rows with the same `(candidato_id, ano, id_municipio, zona)` the
//! first one wins. Both drops are counted and logged on every run.

use mapa_common::types::{CandidateKey, ResultadoZona, ResultadoZonaBruto};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Canonical load batch and what was dropped to produce it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub batch: Vec<ResultadoZona>,
    pub input_rows: usize,
    pub dropped_orphans: usize,
    pub dropped_duplicates: usize,
}

/// Join `raw_rows` to `id_index` and drop orphans and duplicate keys.
///
/// Output order is the order of first occurrence in `raw_rows`.
pub fn reconcile(raw_rows: Vec<ResultadoZonaBruto>, id_index: &HashMap<CandidateKey, i64>) -> Reconciled {
    let input_rows = raw_rows.len();

    if id_index.is_empty() {
        warn!(
            input_rows,
            "Candidate index is empty; the candidate table may be stale or unpopulated, no zone results will be loaded"
        );
        return Reconciled {
            batch: Vec::new(),
            input_rows,
            dropped_orphans: input_rows,
            dropped_duplicates: 0,
        };
    }

    let mut batch = Vec::with_capacity(input_rows);
    let mut seen = HashSet::with_capacity(input_rows);
    let mut dropped_orphans = 0;
    let mut dropped_duplicates = 0;

    for raw in raw_rows {
        let Some(&candidato_id) = id_index.get(&raw.candidate_key()) else {
            dropped_orphans += 1;
            continue;
        };

        let resultado = ResultadoZona {
            candidato_id,
            ano: raw.ano,
            id_municipio: raw.id_municipio,
            zona: raw.zona,
            votos: raw.votos,
        };

        if seen.insert(resultado.key()) {
            batch.push(resultado);
        } else {
            dropped_duplicates += 1;
        }
    }

    info!(
        input_rows,
        kept = batch.len(),
        dropped_orphans,
        dropped_duplicates,
        "Reconciled zone results"
    );

    Reconciled {
        batch,
        input_rows,
        dropped_orphans,
        dropped_duplicates,
    }
}
