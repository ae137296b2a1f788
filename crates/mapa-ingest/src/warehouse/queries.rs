//! Warehouse query texts
//!
//! Every query is scoped to the configured state and source project. Values
//! inlined into a query go through [`sql_string`] (names) or
//! [`sequence_list`] (sequence numbers, digits only).

use crate::config::ScopeConfig;
use crate::error::{IngestError, Result};

/// Builds the query texts for one migration scope
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    scope: ScopeConfig,
}

impl QueryCatalog {
    pub fn new(scope: ScopeConfig) -> Self {
        Self { scope }
    }

    fn table(&self, dataset_table: &str) -> String {
        format!("`{}.{}`", self.scope.source_project, dataset_table)
    }

    fn uf(&self) -> String {
        sql_string(&self.scope.sigla_uf)
    }

    /// Municipalities of the state
    pub fn municipios(&self) -> String {
        format!(
            "SELECT DISTINCT id_municipio, nome, {uf} AS sigla_uf \
             FROM {table} \
             WHERE sigla_uf = {uf} \
             ORDER BY nome",
            uf = self.uf(),
            table = self.table("br_bd_diretorios_brasil.municipio"),
        )
    }

    /// Candidates whose ballot name is in `nomes`, from the minimum year on
    pub fn candidatos(&self, nomes: &[String]) -> Result<String> {
        if nomes.is_empty() {
            return Err(IngestError::InvalidQueryParameter(
                "candidate name list is empty".to_string(),
            ));
        }
        let nomes = nomes.iter().map(|n| sql_string(n)).collect::<Vec<_>>().join(", ");

        Ok(format!(
            "SELECT nome_urna, numero, ano, cargo, sigla_partido AS partido, sequencial, situacao AS resultado \
             FROM {table} \
             WHERE sigla_uf = {uf} AND ano >= {min_year} AND nome_urna IN ({nomes}) \
             ORDER BY nome_urna, ano",
            table = self.table("br_tse_eleicoes.candidatos"),
            uf = self.uf(),
            min_year = self.scope.min_year,
        ))
    }

    /// One row per `(ano, id_municipio, zona)` with the mean coordinates of its
    /// sections; all years from the minimum on, or only `ano`
    pub fn locais_votacao(&self, ano: Option<i32>) -> String {
        let year_filter = match ano {
            Some(ano) => format!("ano = {}", ano),
            None => format!("ano >= {}", self.scope.min_year),
        };

        format!(
            "SELECT ano, id_municipio, zona, \
             AVG(ST_Y(melhor_urbano)) AS latitude, AVG(ST_X(melhor_urbano)) AS longitude \
             FROM {table} \
             WHERE sigla_uf = {uf} AND {year_filter} AND melhor_urbano IS NOT NULL \
             GROUP BY ano, id_municipio, zona \
             ORDER BY ano, id_municipio, zona",
            table = self.table("br_tse_eleicoes.local_secao"),
            uf = self.uf(),
        )
    }

    /// Per-zone votes of the given candidates
    pub fn resultados_zona(&self, sequenciais: &[String]) -> Result<String> {
        Ok(format!(
            "SELECT sequencial_candidato, ano, id_municipio, zona, votos \
             FROM {table} \
             WHERE sigla_uf = {uf} AND sequencial_candidato IN ({list}) \
             ORDER BY sequencial_candidato, zona",
            table = self.table("br_tse_eleicoes.resultados_candidato_municipio_zona"),
            uf = self.uf(),
            list = sequence_list(sequenciais)?,
        ))
    }

    /// Total votes per candidate
    pub fn votos_totais(&self, sequenciais: &[String]) -> Result<String> {
        Ok(format!(
            "SELECT sequencial_candidato, SUM(votos) AS votos_total \
             FROM {table} \
             WHERE sigla_uf = {uf} AND sequencial_candidato IN ({list}) \
             GROUP BY sequencial_candidato",
            table = self.table("br_tse_eleicoes.resultados_candidato"),
            uf = self.uf(),
            list = sequence_list(sequenciais)?,
        ))
    }

    /// Years present in the zone results, newest first
    pub fn anos_disponiveis(&self) -> String {
        format!(
            "SELECT DISTINCT ano \
             FROM {table} \
             WHERE sigla_uf = {uf} \
             ORDER BY ano DESC",
            table = self.table("br_tse_eleicoes.resultados_candidato_municipio_zona"),
            uf = self.uf(),
        )
    }

    /// Located sections per year, latest ten years
    pub fn locais_por_ano(&self) -> String {
        format!(
            "SELECT ano, COUNT(*) AS total_locais \
             FROM {table} \
             WHERE sigla_uf = {uf} AND melhor_urbano IS NOT NULL \
             GROUP BY ano \
             ORDER BY ano DESC \
             LIMIT 10",
            table = self.table("br_tse_eleicoes.local_secao"),
            uf = self.uf(),
        )
    }

    /// First twenty zones of `ano` with their located section counts
    pub fn amostra_zonas(&self, ano: i32) -> String {
        format!(
            "SELECT id_municipio, zona, COUNT(*) AS secoes \
             FROM {table} \
             WHERE sigla_uf = {uf} AND ano = {ano} AND melhor_urbano IS NOT NULL \
             GROUP BY id_municipio, zona \
             ORDER BY id_municipio, zona \
             LIMIT 20",
            table = self.table("br_tse_eleicoes.local_secao"),
            uf = self.uf(),
        )
    }
}

/// Quote `value` as a standard SQL string literal
pub fn sql_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

/// Comma-separated quoted sequence numbers; each must be ASCII digits
pub fn sequence_list(sequenciais: &[String]) -> Result<String> {
    if sequenciais.is_empty() {
        return Err(IngestError::InvalidQueryParameter(
            "sequence number list is empty".to_string(),
        ));
    }

    let mut quoted = Vec::with_capacity(sequenciais.len());
    for sequencial in sequenciais {
        if sequencial.is_empty() || !sequencial.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IngestError::InvalidQueryParameter(format!(
                "sequence number '{}' is not numeric",
                sequencial
            )));
        }
        quoted.push(format!("'{}'", sequencial));
    }
    Ok(quoted.join(", "))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn catalog() -> QueryCatalog {
        QueryCatalog::new(ScopeConfig {
            source_project: "basedosdados".to_string(),
            sigla_uf: "RJ".to_string(),
            min_year: 2016,
        })
    }

    #[test]
    fn test_sql_string_escapes_quotes_and_backslashes() {
        assert_eq!(sql_string("MARIA"), "'MARIA'");
        assert_eq!(sql_string("D'ÁVILA"), r"'D\'ÁVILA'");
        assert_eq!(sql_string(r"A\B"), r"'A\\B'");
    }

    #[test]
    fn test_candidatos_query_inlines_escaped_names() {
        let query = catalog()
            .candidatos(&["MARIA".to_string(), "JOANA D'ARC".to_string()])
            .unwrap();
        assert!(query.contains("`basedosdados.br_tse_eleicoes.candidatos`"));
        assert!(query.contains(r"nome_urna IN ('MARIA', 'JOANA D\'ARC')"));
        assert!(query.contains("ano >= 2016"));
        assert!(query.contains("sigla_uf = 'RJ'"));
    }

    #[test]
    fn test_empty_lists_are_rejected() {
        assert!(matches!(
            catalog().candidatos(&[]),
            Err(IngestError::InvalidQueryParameter(_))
        ));
        assert!(matches!(
            catalog().resultados_zona(&[]),
            Err(IngestError::InvalidQueryParameter(_))
        ));
    }

    #[test]
    fn test_non_numeric_sequence_is_rejected() {
        let err = catalog()
            .votos_totais(&["190001".to_string(), "1' OR '1'='1".to_string()])
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidQueryParameter(ref m) if m.contains("OR")));
    }

    #[test]
    fn test_resultados_zona_query() {
        let query = catalog()
            .resultados_zona(&["190001".to_string(), "190002".to_string()])
            .unwrap();
        assert!(query.contains("sequencial_candidato IN ('190001', '190002')"));
        assert!(query.contains("resultados_candidato_municipio_zona"));
    }

    #[test]
    fn test_locais_votacao_year_filter() {
        assert!(catalog().locais_votacao(None).contains("ano >= 2016"));
        let one_year = catalog().locais_votacao(Some(2024));
        assert!(one_year.contains("ano = 2024"));
        assert!(one_year.contains("AVG(ST_Y(melhor_urbano)) AS latitude"));
    }
}
