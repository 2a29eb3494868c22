//! # Configuration Tests
//!
//! These tests mutate process environment variables, so they run serially.

use claimintake::ProviderContract;
use claimintake_pdf::PdfExtractor;
use claimintake_server::config::{get_config, ConfigError};
use serial_test::serial;
use std::{env, fs, path::PathBuf};
use tempfile::TempDir;

const TEST_VARS: &[&str] = &[
    "PORT",
    "CLAIMINTAKE_TEST_PROVIDER_KEY",
    "CLAIMINTAKE_PROVIDER__API_URL",
    "CLAIMINTAKE_PROVIDER__RETRY__MAX_ATTEMPTS",
    "CLAIMINTAKE_OCR__ENGINE",
];

/// Clears every variable these tests set, so each test starts clean.
fn clear_env_vars() {
    for var in TEST_VARS {
        env::remove_var(var);
    }
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.yml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_defaults_fill_an_empty_file() {
    clear_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "{}\n");

    let config = get_config(Some(path.to_str().unwrap())).expect("config should load");

    assert_eq!(config.port, 9090);
    assert_eq!(config.upload_dir, "uploads");
    assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    assert!(config
        .allowed_content_types
        .contains(&"application/pdf".to_string()));
    assert_eq!(config.max_concurrent_runs, 8);
    assert_eq!(config.pipeline_timeout_secs, 120);
    assert_eq!(config.ocr.engine, PdfExtractor::Auto);
    assert_eq!(config.ocr.language, "eng");
    assert_eq!(config.provider.contract, ProviderContract::ChatCompletions);
    assert!(config.provider.api_key.is_none());
    assert_eq!(config.provider.retry.max_attempts, 3);
    assert!(config.provider.retry.jitter);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env_vars();

    let result = get_config(Some("/nonexistent/claimintake/config.yml"));

    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
#[serial]
fn test_yaml_values_and_placeholders() {
    clear_env_vars();
    env::set_var("CLAIMINTAKE_TEST_PROVIDER_KEY", "key-from-env");
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
port: 8181
ocr:
  engine: "tesseract"
  language: "hin"
provider:
  contract: "structured"
  api_url: "http://localhost:5000/extract"
  api_key: "${CLAIMINTAKE_TEST_PROVIDER_KEY}"
  retry:
    base_delay_ms: 10
"#,
    );

    let config = get_config(Some(path.to_str().unwrap())).expect("config should load");

    assert_eq!(config.port, 8181);
    assert_eq!(config.ocr.engine, PdfExtractor::Tesseract);
    assert_eq!(config.ocr.language, "hin");
    assert_eq!(config.provider.contract, ProviderContract::Structured);
    assert_eq!(config.provider.api_url, "http://localhost:5000/extract");
    assert_eq!(config.provider.api_key.as_deref(), Some("key-from-env"));
    assert_eq!(config.provider.retry.base_delay_ms, 10);
    // Keys absent from the section keep their defaults.
    assert_eq!(config.provider.retry.max_attempts, 3);

    clear_env_vars();
}

#[test]
#[serial]
fn test_unset_placeholder_becomes_empty() {
    clear_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "provider:\n  api_key: \"${CLAIMINTAKE_TEST_PROVIDER_KEY}\"\n",
    );

    let config = get_config(Some(path.to_str().unwrap())).expect("config should load");

    assert_eq!(config.provider.api_key.as_deref(), Some(""));
}

#[test]
#[serial]
fn test_environment_overrides_the_file() {
    clear_env_vars();
    env::set_var("PORT", "9999");
    env::set_var("CLAIMINTAKE_PROVIDER__API_URL", "http://override:1234/v1");
    env::set_var("CLAIMINTAKE_PROVIDER__RETRY__MAX_ATTEMPTS", "5");
    env::set_var("CLAIMINTAKE_OCR__ENGINE", "text_layer");
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
port: 8181
provider:
  api_url: "http://from-file:5000"
"#,
    );

    let config = get_config(Some(path.to_str().unwrap())).expect("config should load");

    assert_eq!(config.port, 9999);
    assert_eq!(config.provider.api_url, "http://override:1234/v1");
    assert_eq!(config.provider.retry.max_attempts, 5);
    assert_eq!(config.ocr.engine, PdfExtractor::TextLayer);

    clear_env_vars();
}
