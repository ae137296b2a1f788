//! Read-only checks of what the store and the warehouse hold for a year

use crate::error::Result;
use crate::resolver::select_as;
use crate::store::{ApplicationStore, Filter};
use crate::warehouse::queries::QueryCatalog;
use crate::warehouse::rows::{AnoDisponivel, LocaisPorAno, ZonaAmostra};
use crate::warehouse::QueryGateway;
use mapa_common::types::{CandidatoResumo, Table};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Store and warehouse contents for one election year
#[derive(Debug, Clone, PartialEq)]
pub struct YearReport {
    pub ano: i32,
    pub candidatos: Vec<CandidatoResumo>,
    pub resultados_zona: usize,
    pub locais_votacao: usize,
    pub anos_disponiveis: Vec<i32>,
    pub locais_por_ano: Vec<LocaisPorAno>,
    pub amostra_zonas: Vec<ZonaAmostra>,
}

impl YearReport {
    /// Emit the report through the log
    pub fn log(&self) {
        info!(ano = self.ano, candidatos = self.candidatos.len(), "Stored candidates");
        for candidato in &self.candidatos {
            info!(nome_urna = %candidato.nome_urna, sequencial = %candidato.sequencial, "Candidate");
        }
        info!(
            ano = self.ano,
            resultados_zona = self.resultados_zona,
            locais_votacao = self.locais_votacao,
            "Stored rows"
        );
        info!(anos = ?self.anos_disponiveis, "Years with zone results in the warehouse");
        for entry in &self.locais_por_ano {
            info!(ano = entry.ano, total_locais = entry.total_locais, "Warehouse polling locations");
        }
        info!(ano = self.ano, zonas = self.amostra_zonas.len(), "Zone sample");
        for zona in &self.amostra_zonas {
            info!(
                id_municipio = %zona.id_municipio,
                zona = %zona.zona,
                secoes = zona.secoes,
                "Zone"
            );
        }
    }
}

/// Runs the inspection queries
pub struct DataInspector {
    gateway: QueryGateway,
    store: Arc<dyn ApplicationStore>,
    catalog: QueryCatalog,
}

impl DataInspector {
    pub fn new(gateway: QueryGateway, store: Arc<dyn ApplicationStore>, catalog: QueryCatalog) -> Self {
        Self {
            gateway,
            store,
            catalog,
        }
    }

    async fn count(&self, table: Table, ano: i32) -> Result<usize> {
        let rows: Vec<Value> =
            select_as(self.store.as_ref(), table, "id", &[Filter::eq("ano", ano)]).await?;
        Ok(rows.len())
    }

    pub async fn inspect_year(&self, ano: i32) -> Result<YearReport> {
        info!(ano, "Inspecting year");

        let candidatos: Vec<CandidatoResumo> = select_as(
            self.store.as_ref(),
            Table::Candidatos,
            "nome_urna,sequencial",
            &[Filter::eq("ano", ano)],
        )
        .await?;
        let resultados_zona = self.count(Table::ResultadosZona, ano).await?;
        let locais_votacao = self.count(Table::LocaisVotacao, ano).await?;

        let anos: Vec<AnoDisponivel> = self
            .gateway
            .fetch("anos_disponiveis", &self.catalog.anos_disponiveis())
            .await?;
        let locais_por_ano = self
            .gateway
            .fetch("locais_por_ano", &self.catalog.locais_por_ano())
            .await?;
        let amostra_zonas = self
            .gateway
            .fetch("amostra_zonas", &self.catalog.amostra_zonas(ano))
            .await?;

        Ok(YearReport {
            ano,
            candidatos,
            resultados_zona,
            locais_votacao,
            anos_disponiveis: anos.into_iter().map(|a| a.ano).collect(),
            locais_por_ano,
            amostra_zonas,
        })
    }
}
