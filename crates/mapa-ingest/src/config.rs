//! Migration configuration
//!
//! Built once at process start from the environment (and `.env`), validated,
//! then handed to the orchestrator. Nothing else in the crate reads the
//! environment.

use crate::error::{IngestError, Result};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Project billed for warehouse queries.
pub const DEFAULT_BILLING_PROJECT: &str = "rj-crm-registry";

/// Project that owns the public electoral datasets.
pub const DEFAULT_SOURCE_PROJECT: &str = "basedosdados";

/// BigQuery REST API root.
pub const DEFAULT_WAREHOUSE_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// State every query is scoped to.
pub const DEFAULT_SIGLA_UF: &str = "RJ";

/// Oldest election year migrated.
pub const DEFAULT_MIN_YEAR: i32 = 2016;

/// File listing the `nome_urna` of the candidates shown on the map.
pub const DEFAULT_CANDIDATES_CSV: &str = "data/Candidatas_RJ__corrigido_.csv";

/// Map color assigned to newly loaded candidates.
pub const DEFAULT_MAP_COLOR: &str = "#ff4444";

/// Records per insert request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Records per insert request for the larger tables (locations, zone results).
pub const DEFAULT_HEAVY_BATCH_SIZE: usize = 50;

/// Pause between successful insert requests, in milliseconds.
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 100;

/// Per-request timeout for the application store, in seconds.
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 60;

/// Application store (PostgREST) connection settings
#[derive(Clone)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// How the warehouse client authenticates
#[derive(Clone)]
pub enum WarehouseCredentials {
    /// Service account key file (`GOOGLE_APPLICATION_CREDENTIALS`)
    KeyFile(PathBuf),
    /// Pre-issued OAuth2 access token
    AccessToken(String),
}

impl std::fmt::Debug for WarehouseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

/// Warehouse (BigQuery) connection settings
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub api_url: String,
    pub billing_project: String,
    pub credentials: WarehouseCredentials,
}

/// Which slice of the public data is migrated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
    pub source_project: String,
    pub sigla_uf: String,
    pub min_year: i32,
}

/// Chunking and pacing of store writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub heavy_batch_size: usize,
    pub pause_ms: u64,
}

impl BatchConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            heavy_batch_size: DEFAULT_HEAVY_BATCH_SIZE,
            pause_ms: DEFAULT_BATCH_PAUSE_MS,
        }
    }
}

/// Everything a migration run needs
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub store: StoreConfig,
    pub warehouse: WarehouseConfig,
    pub scope: ScopeConfig,
    pub batch: BatchConfig,
    pub candidates_csv: PathBuf,
    pub default_map_color: String,
}

impl MigrationConfig {
    /// Load configuration from `.env` and the process environment
    ///
    /// Environment variables:
    /// - `SUPABASE_URL` (required)
    /// - `SUPABASE_SERVICE_KEY`, falling back to `SUPABASE_ANON_KEY` (required)
    /// - `GOOGLE_APPLICATION_CREDENTIALS` or `BIGQUERY_ACCESS_TOKEN` (one required)
    /// - `BIGQUERY_PROJECT_ID`, `BIGQUERY_API_URL`
    /// - `MAPA_SOURCE_PROJECT`, `MAPA_SIGLA_UF`, `MAPA_MIN_YEAR`
    /// - `MAPA_CANDIDATES_CSV`, `MAPA_DEFAULT_MAP_COLOR`
    /// - `MAPA_BATCH_SIZE`, `MAPA_HEAVY_BATCH_SIZE`, `MAPA_BATCH_PAUSE_MS`
    /// - `MAPA_STORE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let url = var("SUPABASE_URL")
            .ok_or_else(|| IngestError::config("SUPABASE_URL is not set"))?;
        let api_key = var("SUPABASE_SERVICE_KEY")
            .or_else(|| var("SUPABASE_ANON_KEY"))
            .ok_or_else(|| {
                IngestError::config("SUPABASE_SERVICE_KEY (or SUPABASE_ANON_KEY) is not set")
            })?;

        let credentials = match (var("GOOGLE_APPLICATION_CREDENTIALS"), var("BIGQUERY_ACCESS_TOKEN")) {
            (Some(path), _) => WarehouseCredentials::KeyFile(PathBuf::from(path)),
            (None, Some(token)) => WarehouseCredentials::AccessToken(token),
            (None, None) => {
                return Err(IngestError::config(
                    "warehouse credentials missing: set GOOGLE_APPLICATION_CREDENTIALS or BIGQUERY_ACCESS_TOKEN",
                ))
            },
        };

        let config = Self {
            store: StoreConfig {
                url,
                api_key,
                timeout_secs: parse_or(&var, "MAPA_STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS)?,
            },
            warehouse: WarehouseConfig {
                api_url: var("BIGQUERY_API_URL")
                    .unwrap_or_else(|| DEFAULT_WAREHOUSE_API_URL.to_string()),
                billing_project: var("BIGQUERY_PROJECT_ID")
                    .unwrap_or_else(|| DEFAULT_BILLING_PROJECT.to_string()),
                credentials,
            },
            scope: ScopeConfig {
                source_project: var("MAPA_SOURCE_PROJECT")
                    .unwrap_or_else(|| DEFAULT_SOURCE_PROJECT.to_string()),
                sigla_uf: var("MAPA_SIGLA_UF").unwrap_or_else(|| DEFAULT_SIGLA_UF.to_string()),
                min_year: parse_or(&var, "MAPA_MIN_YEAR", DEFAULT_MIN_YEAR)?,
            },
            batch: BatchConfig {
                batch_size: parse_or(&var, "MAPA_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
                heavy_batch_size: parse_or(&var, "MAPA_HEAVY_BATCH_SIZE", DEFAULT_HEAVY_BATCH_SIZE)?,
                pause_ms: parse_or(&var, "MAPA_BATCH_PAUSE_MS", DEFAULT_BATCH_PAUSE_MS)?,
            },
            candidates_csv: var("MAPA_CANDIDATES_CSV")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CANDIDATES_CSV)),
            default_map_color: var("MAPA_DEFAULT_MAP_COLOR")
                .unwrap_or_else(|| DEFAULT_MAP_COLOR.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.store.url.starts_with("http://") && !self.store.url.starts_with("https://") {
            return Err(IngestError::config(format!(
                "SUPABASE_URL must be an http(s) URL, got '{}'",
                self.store.url
            )));
        }
        if self.batch.batch_size == 0 || self.batch.heavy_batch_size == 0 {
            return Err(IngestError::config("batch sizes must be greater than 0"));
        }
        if self.scope.min_year <= 0 {
            return Err(IngestError::config("MAPA_MIN_YEAR must be a positive year"));
        }
        if self.scope.sigla_uf.len() != 2 || !self.scope.sigla_uf.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(IngestError::config(format!(
                "MAPA_SIGLA_UF must be a two-letter state code, got '{}'",
                self.scope.sigla_uf
            )));
        }
        Ok(())
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IngestError::config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("SUPABASE_URL", "https://abc.supabase.co"),
        ("SUPABASE_SERVICE_KEY", "service-key"),
        ("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/sa.json"),
    ];

    #[test]
    fn test_defaults_with_required_vars() {
        let config = MigrationConfig::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.store.url, "https://abc.supabase.co");
        assert_eq!(config.warehouse.billing_project, DEFAULT_BILLING_PROJECT);
        assert_eq!(config.scope.sigla_uf, "RJ");
        assert_eq!(config.scope.min_year, 2016);
        assert_eq!(config.batch, BatchConfig::default());
        assert_eq!(config.default_map_color, "#ff4444");
        assert!(matches!(
            config.warehouse.credentials,
            WarehouseCredentials::KeyFile(ref p) if p == &PathBuf::from("/secrets/sa.json")
        ));
    }

    #[test]
    fn test_missing_store_url_is_configuration_error() {
        let err = MigrationConfig::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, IngestError::Configuration(ref m) if m.contains("SUPABASE_URL")));
    }

    #[test]
    fn test_anon_key_fallback_and_access_token() {
        let config = MigrationConfig::from_lookup(lookup(&[
            ("SUPABASE_URL", "http://localhost:54321"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("BIGQUERY_ACCESS_TOKEN", "ya29.token"),
        ]))
        .unwrap();

        assert_eq!(config.store.api_key, "anon");
        assert!(matches!(
            config.warehouse.credentials,
            WarehouseCredentials::AccessToken(ref t) if t == "ya29.token"
        ));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = MigrationConfig::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, IngestError::Configuration(_)));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("MAPA_BATCH_SIZE", "lots"));
        assert!(MigrationConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("MAPA_HEAVY_BATCH_SIZE", "0"));
        assert!(MigrationConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("BIGQUERY_ACCESS_TOKEN", "ya29.secret");
        let config = MigrationConfig::from_lookup(lookup(&vars)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("service-key"));
        assert!(!rendered.contains("ya29.secret"));
    }
}
