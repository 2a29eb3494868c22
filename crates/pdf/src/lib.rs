//! # claimintake-pdf: Text Extraction Adapters
//!
//! Implements the `TextExtractor` trait from `claimintake` for uploaded claim
//! documents. PDFs with a text layer are read directly with the `pdf` crate;
//! scans and images go through Tesseract.

pub mod tesseract;

use async_trait::async_trait;
use claimintake::{
    errors::IntakeError,
    ingest::TextExtractor,
    types::{ExtractedText, ExtractionMethod},
};
use pdf::{content::Op, file::FileOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub use tesseract::TesseractOcr;

// --- Error Definitions ---

#[derive(Error, Debug)]
pub enum PdfExtractError {
    #[error("Failed to parse PDF content: {0}")]
    PdfParse(String),
    #[error("OCR failed: {0}")]
    Ocr(String),
    #[error("The '{engine}' extractor cannot read '{content_type}' documents")]
    Unsupported {
        engine: &'static str,
        content_type: String,
    },
    #[error("No recognizable text in the document")]
    NoText,
    #[error("I/O error during extraction: {0}")]
    Io(#[from] std::io::Error),
    #[error("Extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<PdfExtractError> for IntakeError {
    fn from(err: PdfExtractError) -> Self {
        IntakeError::Ocr(err.to_string())
    }
}

// --- Data Structures ---

/// Which engine reads the uploaded document.
#[derive(Debug, Deserialize, Serialize, Default, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PdfExtractor {
    /// The embedded text layer only. Fails on scans and images.
    TextLayer,
    /// Always OCR, rasterizing PDFs first.
    Tesseract,
    /// The text layer when it has content, OCR otherwise.
    #[default]
    Auto,
}

impl PdfExtractor {
    fn name(self) -> &'static str {
        match self {
            PdfExtractor::TextLayer => "text_layer",
            PdfExtractor::Tesseract => "tesseract",
            PdfExtractor::Auto => "auto",
        }
    }
}

// --- Core Extraction Logic ---

/// Extracts the text layer of every page synchronously.
///
/// Pages are joined with `\n`. Returns the text and the page count.
pub fn extract_text_from_pdf(pdf_data: &[u8]) -> Result<(String, usize), PdfExtractError> {
    let file = FileOptions::cached()
        .load(pdf_data)
        .map_err(|e| PdfExtractError::PdfParse(e.to_string()))?;
    let resolver = file.resolver();
    let page_count = file.num_pages() as usize;
    let mut pages = Vec::with_capacity(page_count);

    for page_num in 0..file.num_pages() {
        let page = file
            .get_page(page_num)
            .map_err(|e| PdfExtractError::PdfParse(e.to_string()))?;
        let mut page_text = String::new();
        if let Some(content) = &page.contents {
            let operations = content
                .operations(&resolver)
                .map_err(|e| PdfExtractError::PdfParse(e.to_string()))?;
            for op in operations.iter() {
                match op {
                    Op::TextDraw { text } => page_text.push_str(&text.to_string_lossy()),
                    Op::TextNewline => page_text.push('\n'),
                    _ => {}
                }
            }
        }
        pages.push(page_text.trim().to_string());
    }
    Ok((pages.join("\n"), page_count))
}

/// A [`TextExtractor`] backed by the text layer, Tesseract, or both.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor {
    engine: PdfExtractor,
    ocr: TesseractOcr,
}

impl PdfTextExtractor {
    pub fn new(engine: PdfExtractor, ocr: TesseractOcr) -> Self {
        Self { engine, ocr }
    }

    pub fn engine(&self) -> PdfExtractor {
        self.engine
    }

    async fn text_layer(&self, path: &Path) -> Result<ExtractedText, PdfExtractError> {
        let data = tokio::fs::read(path).await?;
        let (text, page_count) =
            tokio::task::spawn_blocking(move || extract_text_from_pdf(&data)).await??;
        Ok(ExtractedText {
            text,
            page_count,
            method: ExtractionMethod::TextLayer,
        })
    }

    async fn ocr_pdf(
        &self,
        path: &Path,
        language: &str,
    ) -> Result<ExtractedText, PdfExtractError> {
        let (text, page_count) = self.ocr.recognize_pdf(path, language).await?;
        Ok(ExtractedText {
            text,
            page_count,
            method: ExtractionMethod::Tesseract,
        })
    }

    async fn ocr_image(
        &self,
        path: &Path,
        language: &str,
    ) -> Result<ExtractedText, PdfExtractError> {
        let text = self.ocr.recognize_image(path, language).await?;
        Ok(ExtractedText {
            text,
            page_count: 1,
            method: ExtractionMethod::Tesseract,
        })
    }

    async fn run(
        &self,
        path: &Path,
        content_type: &str,
        language: &str,
    ) -> Result<ExtractedText, PdfExtractError> {
        let is_pdf = content_type == "application/pdf";
        let extracted = match (self.engine, is_pdf) {
            (PdfExtractor::TextLayer, true) => self.text_layer(path).await?,
            (PdfExtractor::TextLayer, false) => {
                return Err(PdfExtractError::Unsupported {
                    engine: self.engine.name(),
                    content_type: content_type.to_string(),
                })
            }
            (PdfExtractor::Tesseract, true) => self.ocr_pdf(path, language).await?,
            (PdfExtractor::Tesseract | PdfExtractor::Auto, false) => {
                self.ocr_image(path, language).await?
            }
            (PdfExtractor::Auto, true) => match self.text_layer(path).await {
                Ok(extracted) if !extracted.text.trim().is_empty() => extracted,
                Ok(_) => {
                    info!("PDF has no text layer, falling back to OCR.");
                    self.ocr_pdf(path, language).await?
                }
                Err(e) => {
                    warn!("Text layer extraction failed, falling back to OCR: {e}");
                    self.ocr_pdf(path, language).await?
                }
            },
        };

        if extracted.text.trim().is_empty() {
            return Err(PdfExtractError::NoText);
        }
        Ok(extracted)
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    #[instrument(skip(self), fields(engine = self.engine.name()))]
    async fn extract(
        &self,
        path: &Path,
        content_type: &str,
        language: &str,
    ) -> Result<ExtractedText, IntakeError> {
        let extracted = self.run(path, content_type, language).await?;
        info!(
            method = ?extracted.method,
            pages = extracted.page_count,
            "Extracted document text."
        );
        Ok(extracted)
    }
}
