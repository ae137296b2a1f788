//! Migration orchestrator
//!
//! Sequences the pipeline stages for a full run (clear, then load every
//! table, then update vote totals), a partial run (zone results and totals
//! only) and the single-year polling-location load. A failing stage stops
//! the run; there is no resume.

use crate::config::{BatchConfig, MigrationConfig};
use crate::error::{IngestError, Result};
use crate::loader::{BatchLoader, UpdateSummary};
use crate::reconcile::reconcile;
use crate::relevant::read_relevant_names;
use crate::resolver::EntityResolver;
use crate::store::{ApplicationStore, Filter};
use crate::warehouse::queries::QueryCatalog;
use crate::warehouse::rows::CandidatoRow;
use crate::warehouse::{QueryGateway, Warehouse};
use chrono::{DateTime, Utc};
use mapa_common::types::{LocalVotacao, Municipio, NovoCandidato, ResultadoZonaBruto, Table, VotosTotal};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Stage of a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStage {
    Idle,
    Clearing,
    LoadingMunicipios,
    LoadingCandidatos,
    LoadingLocais,
    LoadingResultados,
    UpdatingTotals,
    Done,
    Failed,
}

impl MigrationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStage::Idle => "idle",
            MigrationStage::Clearing => "clearing",
            MigrationStage::LoadingMunicipios => "loading_municipios",
            MigrationStage::LoadingCandidatos => "loading_candidatos",
            MigrationStage::LoadingLocais => "loading_locais",
            MigrationStage::LoadingResultados => "loading_resultados",
            MigrationStage::UpdatingTotals => "updating_totals",
            MigrationStage::Done => "done",
            MigrationStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which run produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunKind {
    Full,
    Partial,
    Locations { ano: i32 },
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub kind: RunKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub municipios: usize,
    pub candidatos: usize,
    pub locais_votacao: usize,
    pub resultados_zona: usize,
    pub dropped_orphans: usize,
    pub dropped_duplicates: usize,
    pub totals_updated: usize,
    pub totals_unmatched: usize,
    pub totals_failed: usize,
}

impl MigrationReport {
    fn start(kind: RunKind) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            kind,
            started_at: now,
            finished_at: now,
            municipios: 0,
            candidatos: 0,
            locais_votacao: 0,
            resultados_zona: 0,
            dropped_orphans: 0,
            dropped_duplicates: 0,
            totals_updated: 0,
            totals_unmatched: 0,
            totals_failed: 0,
        }
    }

    /// Rows inserted into `table` during the run
    pub fn rows(&self, table: Table) -> usize {
        match table {
            Table::Municipios => self.municipios,
            Table::Candidatos => self.candidatos,
            Table::LocaisVotacao => self.locais_votacao,
            Table::ResultadosZona => self.resultados_zona,
        }
    }
}

/// Zone results stage outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultsLoad {
    pub loaded: usize,
    pub dropped_orphans: usize,
    pub dropped_duplicates: usize,
}

/// Runs migrations against one warehouse and one application store
pub struct MigrationOrchestrator {
    gateway: QueryGateway,
    store: Arc<dyn ApplicationStore>,
    resolver: EntityResolver,
    loader: BatchLoader,
    catalog: QueryCatalog,
    batch: BatchConfig,
    candidates_csv: PathBuf,
    default_map_color: String,
    stage: MigrationStage,
    history: Vec<MigrationStage>,
}

impl MigrationOrchestrator {
    pub fn new(
        config: &MigrationConfig,
        warehouse: Arc<dyn Warehouse>,
        store: Arc<dyn ApplicationStore>,
    ) -> Self {
        Self {
            gateway: QueryGateway::new(warehouse),
            resolver: EntityResolver::new(store.clone()),
            loader: BatchLoader::new(store.clone(), config.batch.pause()),
            store,
            catalog: QueryCatalog::new(config.scope.clone()),
            batch: config.batch.clone(),
            candidates_csv: config.candidates_csv.clone(),
            default_map_color: config.default_map_color.clone(),
            stage: MigrationStage::Idle,
            history: vec![MigrationStage::Idle],
        }
    }

    /// Current stage
    pub fn stage(&self) -> MigrationStage {
        self.stage
    }

    /// Stages visited by the latest run, in order
    pub fn history(&self) -> &[MigrationStage] {
        &self.history
    }

    fn begin(&mut self, kind: RunKind) -> MigrationReport {
        self.stage = MigrationStage::Idle;
        self.history = vec![MigrationStage::Idle];
        let report = MigrationReport::start(kind);
        info!(run_id = %report.run_id, kind = ?kind, "Starting migration");
        report
    }

    fn enter(&mut self, stage: MigrationStage) {
        info!(stage = %stage, "Entering stage");
        self.stage = stage;
        self.history.push(stage);
    }

    /// Pass `result` through, marking the run failed at the current stage on error
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|source| {
            let stage = self.stage;
            error!(stage = %stage, error = %source, "MIGRATION FAILED at stage {}", stage);
            self.stage = MigrationStage::Failed;
            self.history.push(MigrationStage::Failed);
            IngestError::Stage {
                stage,
                source: Box::new(source),
            }
        })
    }

    fn finish(&mut self, mut report: MigrationReport) -> MigrationReport {
        self.enter(MigrationStage::Done);
        report.finished_at = Utc::now();
        info!(
            run_id = %report.run_id,
            municipios = report.municipios,
            candidatos = report.candidatos,
            locais_votacao = report.locais_votacao,
            resultados_zona = report.resultados_zona,
            dropped_orphans = report.dropped_orphans,
            dropped_duplicates = report.dropped_duplicates,
            totals_updated = report.totals_updated,
            totals_unmatched = report.totals_unmatched,
            totals_failed = report.totals_failed,
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Migration finished"
        );
        report
    }

    /// Clear every table, then load all of them and update vote totals
    pub async fn run_full(&mut self) -> Result<MigrationReport> {
        let mut report = self.begin(RunKind::Full);

        self.enter(MigrationStage::Clearing);
        let cleared = self.clear_tables().await;
        self.check(cleared)?;

        self.enter(MigrationStage::LoadingMunicipios);
        let loaded = self.migrate_municipios().await;
        report.municipios = self.check(loaded)?;

        self.enter(MigrationStage::LoadingCandidatos);
        let loaded = self.migrate_candidatos().await;
        report.candidatos = self.check(loaded)?;

        self.enter(MigrationStage::LoadingLocais);
        let loaded = self.migrate_locais_votacao(None).await;
        report.locais_votacao = self.check(loaded)?;

        self.load_results_and_totals(&mut report).await?;
        Ok(self.finish(report))
    }

    /// Load zone results and update vote totals, keeping every other table
    pub async fn run_partial(&mut self) -> Result<MigrationReport> {
        let mut report = self.begin(RunKind::Partial);
        self.load_results_and_totals(&mut report).await?;
        Ok(self.finish(report))
    }

    async fn load_results_and_totals(&mut self, report: &mut MigrationReport) -> Result<()> {
        self.enter(MigrationStage::LoadingResultados);
        let loaded = self.migrate_resultados_zona().await;
        let results = self.check(loaded)?;
        report.resultados_zona = results.loaded;
        report.dropped_orphans = results.dropped_orphans;
        report.dropped_duplicates = results.dropped_duplicates;

        self.enter(MigrationStage::UpdatingTotals);
        let updated = self.update_votos_totais().await;
        let summary = self.check(updated)?;
        report.totals_updated = summary.updated;
        report.totals_unmatched = summary.unmatched;
        report.totals_failed = summary.failed;
        Ok(())
    }

    /// Insert the polling locations of one year without clearing anything
    pub async fn load_locations_for_year(&mut self, ano: i32) -> Result<MigrationReport> {
        let mut report = self.begin(RunKind::Locations { ano });

        self.enter(MigrationStage::LoadingLocais);
        let loaded = self.migrate_locais_votacao(Some(ano)).await;
        report.locais_votacao = self.check(loaded)?;

        Ok(self.finish(report))
    }

    /// Delete every row, dependents first
    pub async fn clear_tables(&self) -> Result<()> {
        for table in Table::clear_order() {
            let filter = match table {
                Table::Municipios => Filter::neq("id_municipio", 0),
                _ => Filter::gte("id", 0),
            };

            self.store
                .delete(table, &[filter])
                .await
                .map_err(|source| IngestError::Store {
                    table,
                    operation: "delete",
                    source,
                })?;
            info!(table = %table, "Table cleared");
        }
        Ok(())
    }

    pub async fn migrate_municipios(&self) -> Result<usize> {
        let municipios: Vec<Municipio> = self
            .gateway
            .fetch("municipios", &self.catalog.municipios())
            .await?;

        self.loader
            .load(Table::Municipios, &municipios, self.batch.batch_size)
            .await
    }

    pub async fn migrate_candidatos(&self) -> Result<usize> {
        let nomes = read_relevant_names(&self.candidates_csv)?;
        if nomes.is_empty() {
            return Err(IngestError::CandidateList {
                path: self.candidates_csv.clone(),
                message: "no candidate names listed".to_string(),
            });
        }
        info!(names = nomes.len(), "Relevant candidates listed");

        let rows: Vec<CandidatoRow> = self
            .gateway
            .fetch("candidatos", &self.catalog.candidatos(&nomes)?)
            .await?;
        let candidatos: Vec<NovoCandidato> = rows
            .into_iter()
            .map(|row| row.into_novo(&self.default_map_color))
            .collect();

        self.loader
            .load(Table::Candidatos, &candidatos, self.batch.batch_size)
            .await
    }

    /// Polling locations of every year in scope, or only `ano`
    pub async fn migrate_locais_votacao(&self, ano: Option<i32>) -> Result<usize> {
        let locais: Vec<LocalVotacao> = self
            .gateway
            .fetch("locais_votacao", &self.catalog.locais_votacao(ano))
            .await?;

        if locais.is_empty() {
            warn!(ano = ?ano, "Warehouse returned no polling locations");
            return Ok(0);
        }

        self.loader
            .load(Table::LocaisVotacao, &locais, self.batch.heavy_batch_size)
            .await
    }

    pub async fn migrate_resultados_zona(&self) -> Result<ResultsLoad> {
        let index = self.resolver.resolve_candidate_ids().await?;

        let raw: Vec<ResultadoZonaBruto> = if index.is_empty() {
            Vec::new()
        } else {
            let mut sequenciais: Vec<String> = index.keys().map(|key| key.sequencial.clone()).collect();
            sequenciais.sort();
            sequenciais.dedup();
            self.gateway
                .fetch("resultados_zona", &self.catalog.resultados_zona(&sequenciais)?)
                .await?
        };

        let reconciled = reconcile(raw, &index);
        let loaded = self
            .loader
            .load(Table::ResultadosZona, &reconciled.batch, self.batch.heavy_batch_size)
            .await?;

        Ok(ResultsLoad {
            loaded,
            dropped_orphans: reconciled.dropped_orphans,
            dropped_duplicates: reconciled.dropped_duplicates,
        })
    }

    /// Recompute `votos_total` of every stored candidate from the warehouse
    pub async fn update_votos_totais(&self) -> Result<UpdateSummary> {
        let sequences = self.resolver.resolve_candidate_sequences().await?;
        if sequences.is_empty() {
            warn!("No candidates in the store; skipping vote totals");
            return Ok(UpdateSummary::default());
        }

        let sequenciais: Vec<String> = sequences.into_iter().collect();
        let totals: Vec<VotosTotal> = self
            .gateway
            .fetch("votos_totais", &self.catalog.votos_totais(&sequenciais)?)
            .await?;
        info!(candidates = sequenciais.len(), totals = totals.len(), "Vote totals fetched");

        Ok(self.loader.update_votos_totais(&totals).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(MigrationStage::LoadingResultados.to_string(), "loading_resultados");
        assert_eq!(MigrationStage::UpdatingTotals.as_str(), "updating_totals");
    }
}
