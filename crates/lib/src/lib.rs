//! # Claim Document Intake
//!
//! This crate turns an uploaded claim document into structured claim fields:
//! it stages the upload, extracts the document text through a pluggable
//! [`TextExtractor`], asks a hosted language model for the fixed field set and
//! normalizes the loosely structured answer into [`NormalizedExtraction`].

pub mod constants;
pub mod errors;
pub mod ingest;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod types;

pub use errors::{ErrorKind, IntakeError};
pub use ingest::{IncomingFile, TextExtractor, UploadStore};
pub use pipeline::{IntakePipeline, PipelineRun, PipelineSettings, PipelineState, RunMode};
pub use providers::ai::{AiProvider, ExtractionClient, RetryPolicy};
pub use types::{
    CaseDetailRecord, CaseDetailRow, ClaimExtraction, ExtractedText, ExtractionMethod,
    ExtractionPrompt, FraudClassification, NormalizedExtraction, PetitionerProfile,
    ProviderContract, ProviderResponse, UploadedDocument,
};
