//! # Claim Document Handlers
//!
//! Both endpoints accept the same multipart form:
//!
//! - `pdf`: the claim document (PDF or image).
//! - `api_key` (optional): the provider credential for this request.
//! - `language` (optional): the OCR language hint.
//!
//! `/process-pdf` answers with the provider's body as received, while
//! `/api/process-pdf` answers with the normalized extraction.

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::Multipart;
use claimintake::{IncomingFile, IntakeError, NormalizedExtraction, PipelineRun, RunMode};
use serde_json::{json, Value};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{info, warn};

/// The parsed multipart form.
#[derive(Debug, Default)]
struct ProcessPdfForm {
    file: Option<IncomingFile>,
    api_key: Option<String>,
    language: Option<String>,
}

fn malformed(err: impl std::fmt::Display) -> AppError {
    IntakeError::Validation(format!("Malformed multipart request: {err}")).into()
}

async fn read_form(mut multipart: Multipart) -> Result<ProcessPdfForm, AppError> {
    let mut form = ProcessPdfForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "pdf" => {
                if form.file.is_some() {
                    return Err(IntakeError::Validation(
                        "more than one file in the `pdf` field".to_string(),
                    )
                    .into());
                }
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(malformed)?.to_vec();
                info!(
                    file_name = file_name.as_deref().unwrap_or(""),
                    size = data.len(),
                    "Received claim document."
                );
                form.file = Some(IncomingFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            "api_key" => form.api_key = Some(field.text().await.map_err(malformed)?),
            "language" => form.language = Some(field.text().await.map_err(malformed)?),
            _ => {
                warn!("Ignoring unknown multipart field: '{}'", name);
            }
        }
    }
    Ok(form)
}

/// Takes a pipeline slot without waiting, or fails with `Busy`.
fn admit(app_state: &AppState) -> Result<OwnedSemaphorePermit, AppError> {
    app_state
        .admission
        .clone()
        .try_acquire_owned()
        .map_err(|_| AppError::Busy)
}

async fn run_pipeline(
    app_state: &AppState,
    multipart: Multipart,
    mode: RunMode,
) -> Result<PipelineRun, AppError> {
    let _permit = admit(app_state)?;
    let form = read_form(multipart).await?;
    let document = app_state.uploads.receive(form.file).await?;

    let run = app_state
        .pipeline
        .execute(
            document,
            form.api_key.as_deref(),
            form.language.as_deref(),
            mode,
        )
        .await?;
    Ok(run)
}

/// Handler for `POST /process-pdf`.
///
/// Returns the provider's JSON body verbatim.
pub async fn process_pdf_handler(
    State(app_state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let run = run_pipeline(&app_state, multipart, RunMode::Raw).await?;
    Ok(Json(run.response.body))
}

/// Handler for `POST /api/process-pdf`.
///
/// Returns `{result: NormalizedExtraction}`; with `?debug=true` the document
/// metadata, the attempt count and the state trace are added under `debug`.
pub async fn api_process_pdf_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<NormalizedExtraction>>, AppError> {
    let run = run_pipeline(&app_state, multipart, RunMode::Normalized).await?;

    let debug_info = Some(json!({
        "document": run.document,
        "extraction": run.extraction_summary,
        "attempts": run.response.attempts,
        "trace": run.trace,
    }));
    let extraction = run.extraction.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("Normalized run returned no extraction"))
    })?;

    Ok(wrap_response(extraction, debug_params, debug_info))
}
