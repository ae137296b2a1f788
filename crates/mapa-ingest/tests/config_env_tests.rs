//! Configuration loaded from the process environment

use mapa_ingest::config::{MigrationConfig, WarehouseCredentials};
use mapa_ingest::IngestError;
use serial_test::serial;

const VARS: [&str; 8] = [
    "SUPABASE_URL",
    "SUPABASE_SERVICE_KEY",
    "SUPABASE_ANON_KEY",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "BIGQUERY_ACCESS_TOKEN",
    "BIGQUERY_PROJECT_ID",
    "MAPA_MIN_YEAR",
    "MAPA_BATCH_PAUSE_MS",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_reads_overrides() {
    clear_env();
    std::env::set_var("SUPABASE_URL", "https://project.supabase.co");
    std::env::set_var("SUPABASE_ANON_KEY", "anon-key");
    std::env::set_var("BIGQUERY_ACCESS_TOKEN", "ya29.token");
    std::env::set_var("BIGQUERY_PROJECT_ID", "my-billing");
    std::env::set_var("MAPA_MIN_YEAR", "2020");
    std::env::set_var("MAPA_BATCH_PAUSE_MS", "0");

    let config = MigrationConfig::from_env().unwrap();

    assert_eq!(config.store.api_key, "anon-key");
    assert_eq!(config.warehouse.billing_project, "my-billing");
    assert_eq!(config.scope.min_year, 2020);
    assert_eq!(config.batch.pause_ms, 0);
    assert!(matches!(config.warehouse.credentials, WarehouseCredentials::AccessToken(_)));

    clear_env();
}

#[test]
#[serial]
fn test_from_env_without_store_key_fails() {
    clear_env();
    std::env::set_var("SUPABASE_URL", "https://project.supabase.co");
    std::env::set_var("BIGQUERY_ACCESS_TOKEN", "ya29.token");

    let err = MigrationConfig::from_env().unwrap_err();
    assert!(matches!(err, IngestError::Configuration(ref m) if m.contains("SUPABASE_SERVICE_KEY")));

    clear_env();
}

#[test]
#[serial]
fn test_from_env_rejects_non_positive_year() {
    clear_env();
    std::env::set_var("SUPABASE_URL", "https://project.supabase.co");
    std::env::set_var("SUPABASE_SERVICE_KEY", "service-key");
    std::env::set_var("BIGQUERY_ACCESS_TOKEN", "ya29.token");
    std::env::set_var("MAPA_MIN_YEAR", "0");

    assert!(matches!(
        MigrationConfig::from_env(),
        Err(IngestError::Configuration(_))
    ));

    clear_env();
}
