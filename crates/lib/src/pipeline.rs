//! # Intake Pipeline
//!
//! Runs one uploaded document through text extraction, prompt building, the
//! provider call and normalization, strictly in that order. Every run is
//! independent: nothing is shared between concurrent runs except the
//! collaborators, which are stateless.

use crate::{
    constants::{DEFAULT_LANGUAGE, DEFAULT_PIPELINE_TIMEOUT_SECS},
    errors::{ErrorKind, IntakeError},
    ingest::TextExtractor,
    normalize::normalize,
    prompts::{
        build_extraction_prompt_with_template, CLAIM_EXTRACTION_PROMPT, CLAIM_FIELDS,
        EXTENDED_CLAIM_FIELDS,
    },
    providers::ai::AiProvider,
    types::{
        ExtractedText, ExtractionMethod, NormalizedExtraction, ProviderContract, ProviderResponse,
        UploadedDocument,
    },
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, instrument};

/// The states a single run moves through.
///
/// `Done` and `Failed` are terminal; no transition leads back to `Received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Extracting,
    PromptReady,
    /// One outbound attempt. Retried 5xx responses show up as consecutive
    /// `Calling` entries.
    Calling { attempt: u32 },
    Normalizing,
    Done,
    Failed { kind: ErrorKind },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }
}

/// Tunables for a pipeline, usually filled from the server configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Credential used when the request does not carry one.
    pub default_credential: Option<String>,
    pub default_language: String,
    /// Replaces the built-in extraction prompt.
    pub prompt_template: Option<String>,
    /// Bound on the whole run, OCR and every provider attempt included.
    pub timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_credential: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            prompt_template: None,
            timeout: Duration::from_secs(DEFAULT_PIPELINE_TIMEOUT_SECS),
        }
    }
}

/// Summary of the extracted text, kept for debug output once the text itself
/// has been dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub method: ExtractionMethod,
    pub page_count: usize,
    pub characters: usize,
}

impl From<&ExtractedText> for ExtractionSummary {
    fn from(text: &ExtractedText) -> Self {
        Self {
            method: text.method,
            page_count: text.page_count,
            characters: text.text.chars().count(),
        }
    }
}

/// The outcome of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub document: UploadedDocument,
    pub extraction_summary: ExtractionSummary,
    pub response: ProviderResponse,
    /// `None` when the run was asked for the raw provider answer only.
    pub extraction: Option<NormalizedExtraction>,
    pub trace: Vec<PipelineState>,
}

/// Whether a run ends after the provider call or also normalizes its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Raw,
    Normalized,
}

/// Orchestrates the intake steps for one document at a time.
#[derive(Debug, Clone)]
pub struct IntakePipeline {
    extractor: Arc<dyn TextExtractor>,
    provider: Box<dyn AiProvider>,
    settings: PipelineSettings,
}

impl IntakePipeline {
    pub fn new(extractor: Arc<dyn TextExtractor>, provider: Box<dyn AiProvider>) -> Self {
        Self {
            extractor,
            provider,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn contract(&self) -> ProviderContract {
        self.provider.contract()
    }

    /// Runs the full pipeline and normalizes the provider answer.
    pub async fn process(
        &self,
        document: UploadedDocument,
        credential: Option<&str>,
        language: Option<&str>,
    ) -> Result<PipelineRun, IntakeError> {
        self.execute(document, credential, language, RunMode::Normalized)
            .await
    }

    /// Runs the pipeline up to the provider call and returns its raw answer.
    pub async fn process_raw(
        &self,
        document: UploadedDocument,
        credential: Option<&str>,
        language: Option<&str>,
    ) -> Result<PipelineRun, IntakeError> {
        self.execute(document, credential, language, RunMode::Raw).await
    }

    /// Runs the pipeline under the configured timeout. The staged document is
    /// removed afterwards whatever the outcome, including when this future is
    /// dropped before it completes.
    #[instrument(skip_all, fields(document_id = %document.id, mode = ?mode))]
    pub async fn execute(
        &self,
        document: UploadedDocument,
        credential: Option<&str>,
        language: Option<&str>,
        mode: RunMode,
    ) -> Result<PipelineRun, IntakeError> {
        let cleanup = document.cleanup_guard();
        let mut trace = vec![PipelineState::Received];
        info!(file_name = %document.original_filename, size = document.size, "Pipeline run started.");

        let result = match self.resolve_credential(credential) {
            Ok(credential) => {
                let language = language
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .unwrap_or(self.settings.default_language.as_str());
                let timeout = self.settings.timeout;
                tokio::time::timeout(
                    timeout,
                    self.run_steps(&document, credential, language, mode, &mut trace),
                )
                .await
                .unwrap_or(Err(IntakeError::Timeout(timeout)))
            }
            Err(e) => Err(e),
        };

        document.discard().await;
        cleanup.disarm();

        match result {
            Ok((extraction_summary, response, extraction)) => {
                trace.push(PipelineState::Done);
                info!(trace = ?trace, attempts = response.attempts, "Pipeline run finished.");
                Ok(PipelineRun {
                    document,
                    extraction_summary,
                    response,
                    extraction,
                    trace,
                })
            }
            Err(e) => {
                trace.push(PipelineState::Failed { kind: e.kind() });
                error!(trace = ?trace, "Pipeline run failed: {e}");
                Err(e)
            }
        }
    }

    fn resolve_credential<'a>(&'a self, credential: Option<&'a str>) -> Result<&'a str, IntakeError> {
        credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(self
                .settings
                .default_credential
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty()))
            .ok_or_else(|| {
                IntakeError::Validation(
                    "no provider credential supplied and none is configured".to_string(),
                )
            })
    }

    async fn run_steps(
        &self,
        document: &UploadedDocument,
        credential: &str,
        language: &str,
        mode: RunMode,
        trace: &mut Vec<PipelineState>,
    ) -> Result<(ExtractionSummary, ProviderResponse, Option<NormalizedExtraction>), IntakeError> {
        // --- 1. Text extraction ---
        trace.push(PipelineState::Extracting);
        let extracted = self
            .extractor
            .extract(&document.storage_path, &document.content_type, language)
            .await?;
        if extracted.text.trim().is_empty() {
            return Err(IntakeError::Ocr(
                "no recognizable text in the document".to_string(),
            ));
        }
        let summary = ExtractionSummary::from(&extracted);
        debug!(method = ?summary.method, pages = summary.page_count, characters = summary.characters, "Text extracted.");

        // --- 2. Prompt ---
        let contract = self.provider.contract();
        let fields = match contract {
            ProviderContract::ChatCompletions => CLAIM_FIELDS,
            ProviderContract::Structured => EXTENDED_CLAIM_FIELDS,
        };
        let template = self
            .settings
            .prompt_template
            .as_deref()
            .unwrap_or(CLAIM_EXTRACTION_PROMPT);
        let prompt = build_extraction_prompt_with_template(template, &extracted.text, fields);
        drop(extracted);
        trace.push(PipelineState::PromptReady);

        // --- 3. Provider call ---
        let outcome = self.provider.complete(&prompt, credential).await;
        let attempts = match &outcome {
            Ok(response) => response.attempts,
            Err(e) => e.attempts().unwrap_or(1),
        };
        trace.extend((1..=attempts.max(1)).map(|attempt| PipelineState::Calling { attempt }));
        let response = outcome?;

        if mode == RunMode::Raw {
            return Ok((summary, response, None));
        }

        // --- 4. Normalization ---
        trace.push(PipelineState::Normalizing);
        let extraction = normalize(contract, &response.body)?;
        Ok((summary, response, Some(extraction)))
    }
}
