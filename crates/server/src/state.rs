//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the logic
//! for building it at startup: the upload store, the intake pipeline with its
//! text extractor and provider client, and the admission semaphore.

use crate::config::AppConfig;
use claimintake::{
    ExtractionClient, IntakePipeline, PipelineSettings, RetryPolicy, UploadStore,
};
use claimintake_pdf::{PdfTextExtractor, TesseractOcr};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<IntakePipeline>,
    pub uploads: UploadStore,
    /// One permit per pipeline run allowed at the same time.
    pub admission: Arc<Semaphore>,
}

impl AppState {
    /// Assembles the state around an already built pipeline.
    pub fn new(config: AppConfig, pipeline: IntakePipeline) -> Self {
        let uploads = UploadStore::new(&config.upload_dir)
            .with_max_bytes(config.max_upload_bytes)
            .with_allowed_types(config.allowed_content_types.clone());
        let admission = Arc::new(Semaphore::new(config.max_concurrent_runs.max(1)));
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            uploads,
            admission,
        }
    }
}

/// Builds the shared application state from the configuration.
///
/// The provider client and the OCR tools are created here once; each request
/// only borrows them.
pub fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let provider_config = &config.provider;
    let client = ExtractionClient::new(
        provider_config.api_url.clone(),
        Some(provider_config.model_name.clone()),
        provider_config.contract,
        provider_config.request_timeout_secs.map(Duration::from_secs),
    )?
    .with_max_tokens(provider_config.max_tokens)
    .with_retry_policy(RetryPolicy::from(&provider_config.retry));
    info!(
        api_url = %provider_config.api_url,
        model = %client.model(),
        contract = ?provider_config.contract,
        "Initialized extraction provider client."
    );

    let ocr = TesseractOcr::new(
        &config.ocr.tesseract_bin,
        &config.ocr.pdftoppm_bin,
        config.ocr.dpi,
    );
    let extractor = PdfTextExtractor::new(config.ocr.engine, ocr);
    info!(engine = ?config.ocr.engine, "Initialized text extractor.");

    let pipeline = IntakePipeline::new(Arc::new(extractor), Box::new(client)).with_settings(
        PipelineSettings {
            default_credential: provider_config.api_key.clone(),
            default_language: config.ocr.language.clone(),
            prompt_template: provider_config.prompt_template.clone(),
            timeout: Duration::from_secs(config.pipeline_timeout_secs),
        },
    );

    Ok(AppState::new(config, pipeline))
}
