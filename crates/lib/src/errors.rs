use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the document-intake pipeline.
///
/// Every stage maps its failures into one of these variants so the HTTP layer
/// can turn them into a single `{error, details}` response.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Text extraction failed: {0}")]
    Ocr(String),
    #[error("Failed to reach the extraction provider on attempt {attempts}: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
        attempts: u32,
    },
    #[error("Extraction provider rejected the credential (HTTP {status}): {body}")]
    Authentication {
        status: u16,
        body: String,
        attempts: u32,
    },
    /// A 4xx other than 401/403. Counts as invalid input.
    #[error("Extraction provider rejected the request (HTTP {status}): {body}")]
    Rejected {
        status: u16,
        body: String,
        attempts: u32,
    },
    #[error("Extraction provider failed after {attempts} attempt(s) (HTTP {status}): {body}")]
    ExtractionService {
        status: u16,
        body: String,
        attempts: u32,
    },
    #[error("Could not parse extraction result: {0}")]
    Normalization(String),
    #[error("Pipeline did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Upload storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(#[source] reqwest::Error),
}

/// The coarse category of an [`IntakeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Ocr,
    Transport,
    Authentication,
    ExtractionService,
    Normalization,
    Timeout,
    Internal,
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::Validation(_) | IntakeError::Rejected { .. } => ErrorKind::Validation,
            IntakeError::Ocr(_) => ErrorKind::Ocr,
            IntakeError::Transport { .. } => ErrorKind::Transport,
            IntakeError::Authentication { .. } => ErrorKind::Authentication,
            IntakeError::ExtractionService { .. } => ErrorKind::ExtractionService,
            IntakeError::Normalization(_) => ErrorKind::Normalization,
            IntakeError::Timeout(_) => ErrorKind::Timeout,
            IntakeError::Storage(_) | IntakeError::ReqwestClientBuild(_) => ErrorKind::Internal,
        }
    }

    /// Outbound provider attempts made before this error, when it came from
    /// the provider call.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            IntakeError::Transport { attempts, .. }
            | IntakeError::Authentication { attempts, .. }
            | IntakeError::Rejected { attempts, .. }
            | IntakeError::ExtractionService { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for IntakeError {
    fn from(err: serde_json::Error) -> Self {
        IntakeError::Normalization(err.to_string())
    }
}
