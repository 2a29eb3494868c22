//! # Upload Receiver
//!
//! Validates an uploaded file and stages it on disk under a generated key, so
//! two uploads that share a filename never collide.

use crate::{
    constants::{DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOAD_DIR},
    errors::IntakeError,
    types::UploadedDocument,
};
use chrono::Utc;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

const OCTET_STREAM: &str = "application/octet-stream";

/// A file part as read from an incoming request, before validation.
#[derive(Debug, Clone, Default)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Stages uploads in a directory, enforcing a size limit and a content-type
/// allowlist.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
    allowed_types: Vec<String>,
}

impl Default for UploadStore {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_DIR)
    }
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types
            .into_iter()
            .map(|t| t.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validates the file and writes it under a fresh storage key.
    ///
    /// `None` means the request carried no file field at all.
    pub async fn receive(&self, file: Option<IncomingFile>) -> Result<UploadedDocument, IntakeError> {
        let file = file.ok_or_else(|| {
            IntakeError::Validation("no file uploaded in the `pdf` field".to_string())
        })?;

        if file.data.is_empty() {
            return Err(IntakeError::Validation("uploaded file is empty".to_string()));
        }
        if file.data.len() > self.max_bytes {
            return Err(IntakeError::Validation(format!(
                "uploaded file is {} bytes, the limit is {} bytes",
                file.data.len(),
                self.max_bytes
            )));
        }

        let original_filename = display_name(file.file_name.as_deref());
        let content_type = self.resolve_content_type(&original_filename, file.content_type.as_deref())?;

        let id = Uuid::new_v4();
        let extension = sanitized_extension(&original_filename)
            .or_else(|| canonical_extension(&content_type).map(str::to_string));
        let key = match extension {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        };
        let storage_path = self.dir.join(key);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&storage_path, &file.data).await?;

        info!(
            %id,
            file_name = %original_filename,
            size = file.data.len(),
            content_type = %content_type,
            "Stored uploaded document."
        );

        Ok(UploadedDocument {
            id,
            original_filename,
            storage_path,
            size: file.data.len(),
            content_type,
            received_at: Utc::now(),
        })
    }

    fn resolve_content_type(
        &self,
        file_name: &str,
        declared: Option<&str>,
    ) -> Result<String, IntakeError> {
        let declared = declared
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty() && ct != OCTET_STREAM);

        let content_type = match declared {
            Some(ct) => ct,
            None => content_type_for_extension(file_name)
                .map(str::to_string)
                .ok_or_else(|| {
                    IntakeError::Validation(format!(
                        "cannot determine the content type of '{file_name}'"
                    ))
                })?,
        };

        if !self.allowed_types.iter().any(|allowed| *allowed == content_type) {
            return Err(IntakeError::Validation(format!(
                "content type '{content_type}' is not accepted; expected one of: {}",
                self.allowed_types.join(", ")
            )));
        }
        Ok(content_type)
    }
}

/// Removes a staged file when dropped unless disarmed first.
///
/// Covers runs whose future is dropped before they reach
/// [`UploadedDocument::discard`], e.g. when the client disconnects.
#[derive(Debug)]
pub struct StagedFileGuard {
    path: PathBuf,
    armed: bool,
}

impl StagedFileGuard {
    /// Keeps the file; the caller has removed it or taken it over.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFileGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed staged document of an abandoned run."),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                "Failed to remove staged document of an abandoned run: {e}"
            ),
        }
    }
}

impl UploadedDocument {
    /// A guard that deletes the staged file if it is dropped while armed.
    pub fn cleanup_guard(&self) -> StagedFileGuard {
        StagedFileGuard {
            path: self.storage_path.clone(),
            armed: true,
        }
    }

    /// Removes the staged file. A file that is already gone is not an error.
    pub async fn discard(&self) {
        match tokio::fs::remove_file(&self.storage_path).await {
            Ok(()) => debug!(id = %self.id, "Removed staged document."),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                id = %self.id,
                path = %self.storage_path.display(),
                "Failed to remove staged document: {e}"
            ),
        }
    }
}

/// The last path component of the client-supplied name.
fn display_name(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("upload")
        .to_string()
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn sanitized_extension(file_name: &str) -> Option<String> {
    extension_of(file_name)
        .map(|ext| {
            ext.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(8)
                .collect::<String>()
        })
        .filter(|ext| !ext.is_empty())
}

fn content_type_for_extension(file_name: &str) -> Option<&'static str> {
    match extension_of(file_name)?.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

fn canonical_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "application/pdf" => Some("pdf"),
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/tiff" => Some("tiff"),
        _ => None,
    }
}
