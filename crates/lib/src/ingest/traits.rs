use crate::{errors::IntakeError, types::ExtractedText};
use async_trait::async_trait;
use std::{fmt::Debug, path::Path};

/// The contract for anything that turns a stored document into plain text.
///
/// Implementations wrap a text-recognition engine. They are called once per
/// pipeline run and are never retried, so any failure should be reported as
/// [`IntakeError::Ocr`].
#[async_trait]
pub trait TextExtractor: Send + Sync + Debug {
    /// Extracts the text of the document at `path`.
    ///
    /// # Arguments
    ///
    /// * `path`: Where the upload receiver stored the document.
    /// * `content_type`: The validated content type of the document.
    /// * `language`: An OCR language hint such as `eng`.
    async fn extract(
        &self,
        path: &Path,
        content_type: &str,
        language: &str,
    ) -> Result<ExtractedText, IntakeError>;
}
