use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use claimintake::{ErrorKind, IntakeError};
use serde_json::json;
use tracing::{error, warn};

/// A custom error type for the server application.
///
/// Every variant is rendered as a JSON `{error, details}` body.
#[derive(Debug)]
pub enum AppError {
    /// Errors originating from the intake pipeline.
    Intake(IntakeError),
    /// No admission permit was free for a new run.
    Busy,
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        AppError::Intake(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Intake(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ErrorKind::Ocr
                | ErrorKind::Transport
                | ErrorKind::Authentication
                | ErrorKind::ExtractionService
                | ErrorKind::Normalization
                | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let (error_message, details) = match &self {
            AppError::Intake(err) => {
                let message = match err.kind() {
                    ErrorKind::Validation => "Invalid request.",
                    ErrorKind::Ocr => "Failed to extract text from the document.",
                    ErrorKind::Transport => "Failed to reach the extraction provider.",
                    ErrorKind::Authentication => "The extraction provider rejected the API key.",
                    ErrorKind::ExtractionService => "The extraction provider returned an error.",
                    ErrorKind::Normalization => "Failed to parse the extraction result.",
                    ErrorKind::Timeout => "Processing timed out.",
                    ErrorKind::Internal => "An internal server error occurred.",
                };
                if status_code.is_server_error() {
                    error!("IntakeError: {:?}", err);
                } else {
                    warn!("Rejected request: {err}");
                }
                (message, err.to_string())
            }
            AppError::Busy => {
                warn!("Rejected request: no free pipeline slot.");
                (
                    "Server is busy.",
                    "Too many documents are being processed. Retry later.".to_string(),
                )
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                ("An internal server error occurred.", err.to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "details": details,
        }));

        (status_code, body).into_response()
    }
}
