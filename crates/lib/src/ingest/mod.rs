//! # Document Intake
//!
//! Receiving uploads and the extraction seam that turns them into text.

pub mod traits;
pub mod upload;

pub use traits::TextExtractor;
pub use upload::{IncomingFile, StagedFileGuard, UploadStore};
