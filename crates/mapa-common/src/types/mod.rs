//! Typed rows of the application tables
//!
//! Every struct here serializes to exactly the JSON object the application
//! store expects for its table, so loaders never build untyped maps.

use serde::{Deserialize, Deserializer, Serialize};

/// Application tables, in load (dependency) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Municipios,
    Candidatos,
    LocaisVotacao,
    ResultadosZona,
}

impl Table {
    /// Tables in the order they must be populated
    pub const LOAD_ORDER: [Table; 4] = [
        Table::Municipios,
        Table::Candidatos,
        Table::LocaisVotacao,
        Table::ResultadosZona,
    ];

    /// Tables in the order they must be cleared: dependents first
    pub fn clear_order() -> impl Iterator<Item = Table> {
        Self::LOAD_ORDER.into_iter().rev()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Municipios => "municipios",
            Table::Candidatos => "candidatos",
            Table::LocaisVotacao => "locais_votacao",
            Table::ResultadosZona => "resultados_zona",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural key of a candidate in the warehouse: `(sequencial, ano)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateKey {
    pub sequencial: String,
    pub ano: i32,
}

impl CandidateKey {
    pub fn new(sequencial: impl Into<String>, ano: i32) -> Self {
        Self {
            sequencial: sequencial.into(),
            ano,
        }
    }
}

impl std::fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.sequencial, self.ano)
    }
}

/// A municipality of the deployment's state (`municipios`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipio {
    pub id_municipio: String,
    pub nome: String,
    pub sigla_uf: String,
}

/// A candidate row as inserted into `candidatos`.
///
/// The surrogate `id` is assigned by the store and is therefore absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovoCandidato {
    pub nome_urna: String,
    pub numero: Option<String>,
    pub ano: i32,
    pub cargo: Option<String>,
    pub partido: Option<String>,
    pub sequencial: String,
    /// Raw outcome status as published by the electoral court
    pub resultado: Option<String>,
    pub ativo: bool,
    pub cor_mapa: String,
}

impl NovoCandidato {
    pub fn key(&self) -> CandidateKey {
        CandidateKey::new(self.sequencial.clone(), self.ano)
    }
}

/// The identifying columns of a stored candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatoRef {
    pub id: i64,
    #[serde(deserialize_with = "string_or_integer")]
    pub sequencial: String,
    pub ano: i32,
}

/// Sequence number of a stored candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatoSequencial {
    #[serde(deserialize_with = "string_or_integer")]
    pub sequencial: String,
}

/// Name and sequence number of a stored candidate, as listed by inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatoResumo {
    pub nome_urna: String,
    #[serde(deserialize_with = "string_or_integer")]
    pub sequencial: String,
}

/// A polling location (`locais_votacao`), one per `(ano, id_municipio, zona)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalVotacao {
    pub ano: i32,
    pub id_municipio: String,
    pub zona: String,
    /// Mean latitude of the zone's section points
    pub latitude: f64,
    /// Mean longitude of the zone's section points
    pub longitude: f64,
}

/// A per-zone vote count as returned by the warehouse, keyed on the
/// candidate's natural key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultadoZonaBruto {
    pub sequencial_candidato: String,
    pub ano: i32,
    pub id_municipio: String,
    pub zona: String,
    pub votos: i64,
}

impl ResultadoZonaBruto {
    pub fn candidate_key(&self) -> CandidateKey {
        CandidateKey::new(self.sequencial_candidato.clone(), self.ano)
    }
}

/// Composite key of `resultados_zona`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneResultKey {
    pub candidato_id: i64,
    pub ano: i32,
    pub id_municipio: String,
    pub zona: String,
}

/// A per-zone vote count keyed on the store's candidate id (`resultados_zona`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultadoZona {
    pub candidato_id: i64,
    pub ano: i32,
    pub id_municipio: String,
    pub zona: String,
    pub votos: i64,
}

impl ResultadoZona {
    pub fn key(&self) -> ZoneResultKey {
        ZoneResultKey {
            candidato_id: self.candidato_id,
            ano: self.ano,
            id_municipio: self.id_municipio.clone(),
            zona: self.zona.clone(),
        }
    }
}

/// Total votes of a candidate across every zone and municipality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotosTotal {
    pub sequencial_candidato: String,
    pub votos_total: i64,
}

/// Accepts a JSON string or integer; numeric text columns come back either way
fn string_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Integer(n) => n.to_string(),
    })
}
