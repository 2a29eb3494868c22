//! # Prompt Template Modules
//!
//! Prompt templates used to ask the provider for structured claim fields.

pub mod extraction;

pub use extraction::{
    build_extraction_prompt, build_extraction_prompt_with_template, CLAIM_EXTRACTION_PROMPT,
    CLAIM_FIELDS, EXTENDED_CLAIM_FIELDS,
};
