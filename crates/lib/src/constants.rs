//! # Shared Constants
//!
//! Defaults shared by the library, the PDF extractors and the server so that
//! every crate agrees on the same limits and provider settings.

/// Directory where uploads are staged while a pipeline run is in flight.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Largest accepted upload (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Content types accepted by the upload receiver.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] =
    &["application/pdf", "image/png", "image/jpeg", "image/tiff"];

/// OCR language hint used when the request does not supply one.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Rasterization resolution for scanned PDFs.
pub const DEFAULT_OCR_DPI: u32 = 300;

pub const DEFAULT_API_URL: &str = "https://cloud.olakrutrim.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "Gemma-2-27B-IT";
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Total attempts (first call plus retries) against a provider returning 5xx.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 250;
pub const DEFAULT_MAX_DELAY_MS: u64 = 4_000;

pub const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 8;
