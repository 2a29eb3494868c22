//! Tesseract OCR through the `pdftoppm` and `tesseract` command-line tools.

use crate::PdfExtractError;
use claimintake::constants::DEFAULT_OCR_DPI;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs the external OCR tools. Child processes are killed if the run is
/// dropped, so a cancelled request does not leave them behind.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tesseract_bin: PathBuf,
    pdftoppm_bin: PathBuf,
    dpi: u32,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", "pdftoppm", DEFAULT_OCR_DPI)
    }
}

impl TesseractOcr {
    pub fn new(
        tesseract_bin: impl Into<PathBuf>,
        pdftoppm_bin: impl Into<PathBuf>,
        dpi: u32,
    ) -> Self {
        Self {
            tesseract_bin: tesseract_bin.into(),
            pdftoppm_bin: pdftoppm_bin.into(),
            dpi,
        }
    }

    /// Recognizes a single image file.
    pub async fn recognize_image(
        &self,
        image: &Path,
        language: &str,
    ) -> Result<String, PdfExtractError> {
        let output = Command::new(&self.tesseract_bin)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PdfExtractError::Ocr(format!(
                    "failed to run {}: {e}",
                    self.tesseract_bin.display()
                ))
            })?;

        if !output.status.success() {
            return Err(PdfExtractError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Rasterizes every page of a PDF and recognizes them in order.
    ///
    /// Returns the page texts joined with `\n` and the number of pages.
    pub async fn recognize_pdf(
        &self,
        pdf: &Path,
        language: &str,
    ) -> Result<(String, usize), PdfExtractError> {
        // Directory creation and removal touch the filesystem synchronously.
        let pages_dir = tokio::task::spawn_blocking(tempdir).await??;
        let result = self.recognize_pages(pdf, pages_dir.path(), language).await;
        if let Err(e) = tokio::task::spawn_blocking(move || pages_dir.close()).await? {
            warn!("Failed to remove OCR page directory: {e}");
        }
        result
    }

    async fn recognize_pages(
        &self,
        pdf: &Path,
        pages_dir: &Path,
        language: &str,
    ) -> Result<(String, usize), PdfExtractError> {
        let pages = self.rasterize(pdf, pages_dir).await?;
        info!(pages = pages.len(), dpi = self.dpi, "Rasterized PDF for OCR.");

        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            debug!(page = %page.display(), "Running tesseract on page");
            texts.push(self.recognize_image(page, language).await?);
        }
        Ok((texts.join("\n"), pages.len()))
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, PdfExtractError> {
        let output = Command::new(&self.pdftoppm_bin)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(out_dir.join("page"))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PdfExtractError::Ocr(format!(
                    "failed to run {}: {e}",
                    self.pdftoppm_bin.display()
                ))
            })?;

        if !output.status.success() {
            return Err(PdfExtractError::Ocr(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // pdftoppm zero-pads page numbers to a common width, so name order is page order.
        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                pages.push(path);
            }
        }
        pages.sort();

        if pages.is_empty() {
            return Err(PdfExtractError::Ocr(
                "pdftoppm produced no page images".to_string(),
            ));
        }
        Ok(pages)
    }
}
