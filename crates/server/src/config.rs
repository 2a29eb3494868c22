//! # Application Configuration
//!
//! This module defines the configuration structure for the `claimintake-server`
//! and loads it from built-in defaults, an optional `config.yml` and
//! environment variables.

use claimintake::{
    constants::{
        DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_API_URL, DEFAULT_BASE_DELAY_MS,
        DEFAULT_LANGUAGE, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENT_RUNS,
        DEFAULT_MAX_DELAY_MS, DEFAULT_MAX_TOKENS, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL,
        DEFAULT_OCR_DPI, DEFAULT_PIPELINE_TIMEOUT_SECS, DEFAULT_UPLOAD_DIR,
    },
    ProviderContract, RetryPolicy,
};
use claimintake_pdf::PdfExtractor;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::{env, fs, sync::LazyLock, time::Duration};
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates an explicitly requested configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Where uploads are staged while they are processed.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,
    /// Pipeline runs allowed at once; further requests get 503.
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    #[serde(default = "default_pipeline_timeout_secs")]
    pub pipeline_timeout_secs: u64,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_port() -> u16 {
    9090
}

fn default_upload_dir() -> String {
    DEFAULT_UPLOAD_DIR.to_string()
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_allowed_content_types() -> Vec<String> {
    DEFAULT_ALLOWED_CONTENT_TYPES
        .iter()
        .map(|t| t.to_string())
        .collect()
}

fn default_max_concurrent_runs() -> usize {
    DEFAULT_MAX_CONCURRENT_RUNS
}

fn default_pipeline_timeout_secs() -> u64 {
    DEFAULT_PIPELINE_TIMEOUT_SECS
}

/// Settings for the text extraction engines.
#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default)]
    pub engine: PdfExtractor,
    /// Default OCR language, overridable per request.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_tesseract_bin")]
    pub tesseract_bin: String,
    #[serde(default = "default_pdftoppm_bin")]
    pub pdftoppm_bin: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: PdfExtractor::default(),
            language: default_language(),
            dpi: default_dpi(),
            tesseract_bin: default_tesseract_bin(),
            pdftoppm_bin: default_pdftoppm_bin(),
        }
    }
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_dpi() -> u32 {
    DEFAULT_OCR_DPI
}

fn default_tesseract_bin() -> String {
    "tesseract".to_string()
}

fn default_pdftoppm_bin() -> String {
    "pdftoppm".to_string()
}

/// The hosted extraction provider.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default)]
    pub contract: ProviderContract,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Fallback credential for requests that do not send `api_key`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-attempt HTTP timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Replaces the built-in extraction prompt template.
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            contract: ProviderContract::default(),
            api_url: default_api_url(),
            api_key: None,
            model_name: default_model_name(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: None,
            prompt_template: None,
            retry: RetryConfig::default(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model_name() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

fn default_jitter() -> bool {
    true
}

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").expect("placeholder pattern is valid")
});

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let expanded_content = ENV_PLACEHOLDER.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration from a file and environment variables.
///
/// - Every key has a built-in default, so the YAML file is optional unless a
///   path is passed explicitly.
/// - `${VAR}` placeholders in the YAML are replaced from the environment.
/// - Top-level keys like `port` are overridden by `PORT`.
/// - Nested keys are overridden by `CLAIMINTAKE_...` variables (e.g.,
///   `CLAIMINTAKE_PROVIDER__API_URL`).
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder();

    let main_content = match config_path_override {
        Some(path) => Some(read_and_substitute(path)?.ok_or_else(|| {
            ConfigError::NotFound(format!("Config file not found at '{path}'."))
        })?),
        None => {
            let user_config_path = format!("{base_path}/config.yml");
            let content = read_and_substitute(&user_config_path)?;
            match &content {
                Some(_) => info!("Loading configuration from '{user_config_path}'."),
                None => info!("'{user_config_path}' not found. Using built-in defaults."),
            }
            content
        }
    };
    if let Some(content) = main_content {
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        // Plain environment variables for top-level keys like PORT.
        .add_source(Environment::default().try_parsing(true))
        // Prefixed environment variables for nested overrides.
        .add_source(
            Environment::with_prefix("CLAIMINTAKE")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    Ok(config)
}
