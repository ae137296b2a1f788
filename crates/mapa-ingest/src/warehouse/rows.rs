//! Row decoders for the warehouse queries

use super::tabular::{FromRow, RowRef};
use crate::error::Result;
use mapa_common::types::{LocalVotacao, Municipio, NovoCandidato, ResultadoZonaBruto, VotosTotal};

impl FromRow for Municipio {
    const RECORD: &'static str = "municipio";
    const COLUMNS: &'static [&'static str] = &["id_municipio", "nome", "sigla_uf"];

    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok(Self {
            id_municipio: row.get_string("id_municipio")?,
            nome: row.get_string("nome")?,
            sigla_uf: row.get_string("sigla_uf")?,
        })
    }
}

/// A candidate as published in the warehouse, before store defaults apply.
///
/// Descriptive attributes may be null upstream and are passed through as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatoRow {
    pub nome_urna: String,
    pub numero: Option<String>,
    pub ano: i32,
    pub cargo: Option<String>,
    pub partido: Option<String>,
    pub sequencial: String,
    pub resultado: Option<String>,
}

impl CandidatoRow {
    /// Store row with the defaults for a newly loaded candidate
    pub fn into_novo(self, cor_mapa: &str) -> NovoCandidato {
        NovoCandidato {
            nome_urna: self.nome_urna,
            numero: self.numero,
            ano: self.ano,
            cargo: self.cargo,
            partido: self.partido,
            sequencial: self.sequencial,
            resultado: self.resultado,
            ativo: true,
            cor_mapa: cor_mapa.to_string(),
        }
    }
}

impl FromRow for CandidatoRow {
    const RECORD: &'static str = "candidato";
    const COLUMNS: &'static [&'static str] = &[
        "nome_urna",
        "numero",
        "ano",
        "cargo",
        "partido",
        "sequencial",
        "resultado",
    ];

    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok(Self {
            nome_urna: row.get_string("nome_urna")?,
            numero: row.get_opt_string("numero")?,
            ano: row.get_i32("ano")?,
            cargo: row.get_opt_string("cargo")?,
            partido: row.get_opt_string("partido")?,
            sequencial: row.get_string("sequencial")?,
            resultado: row.get_opt_string("resultado")?,
        })
    }
}

impl FromRow for LocalVotacao {
    const RECORD: &'static str = "local_votacao";
    const COLUMNS: &'static [&'static str] = &["ano", "id_municipio", "zona", "latitude", "longitude"];

    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok(Self {
            ano: row.get_i32("ano")?,
            id_municipio: row.get_string("id_municipio")?,
            zona: row.get_string("zona")?,
            latitude: row.get_f64("latitude")?,
            longitude: row.get_f64("longitude")?,
        })
    }
}

impl FromRow for ResultadoZonaBruto {
    const RECORD: &'static str = "resultado_zona";
    const COLUMNS: &'static [&'static str] =
        &["sequencial_candidato", "ano", "id_municipio", "zona", "votos"];

    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok(Self {
            sequencial_candidato: row.get_string("sequencial_candidato")?,
            ano: row.get_i32("ano")?,
            id_municipio: row.get_string("id_municipio")?,
            zona: row.get_string("zona")?,
            votos: row.get_i64("votos")?,
        })
    }
}

impl FromRow for VotosTotal {
    const RECORD: &'static str = "votos_total";
    const COLUMNS: &'static [&'static str] = &["sequencial_candidato", "votos_total"];

    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok(Self {
            sequencial_candidato: row.get_string("sequencial_candidato")?,
            votos_total: row.get_i64("votos_total")?,
        })
    }
}

/// A year present in the zone results table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnoDisponivel {
    pub ano: i32,
}

impl FromRow for AnoDisponivel {
    const RECORD: &'static str = "ano_disponivel";
    const COLUMNS: &'static [&'static str] = &["ano"];

    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok(Self {
            ano: row.get_i32("ano")?,
        })
    }
}

/// Number of distinct polling locations published for a year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaisPorAno {
    pub ano: i32,
    pub total_locais: i64,
}

impl FromRow for LocaisPorAno {
    const RECORD: &'static str = "locais_por_ano";
    const COLUMNS: &'static [&'static str] = &["ano", "total_locais"];

    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok(Self {
            ano: row.get_i32("ano")?,
            total_locais: row.get_i64("total_locais")?,
        })
    }
}

/// A zone and how many voting sections it has
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonaAmostra {
    pub id_municipio: String,
    pub zona: String,
    pub secoes: i64,
}

impl FromRow for ZonaAmostra {
    const RECORD: &'static str = "zona_amostra";
    const COLUMNS: &'static [&'static str] = &["id_municipio", "zona", "secoes"];

    fn from_row(row: &RowRef<'_>) -> Result<Self> {
        Ok(Self {
            id_municipio: row.get_string("id_municipio")?,
            zona: row.get_string("zona")?,
            secoes: row.get_i64("secoes")?,
        })
    }
}
