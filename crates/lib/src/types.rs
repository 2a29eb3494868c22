//! # Pipeline Data Model
//!
//! The records that flow through one intake run, from the stored upload to the
//! normalized claim fields handed back to the UI.

use crate::normalize::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A file accepted by the upload receiver and staged on disk.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedDocument {
    pub id: Uuid,
    pub original_filename: String,
    #[serde(skip)]
    pub storage_path: PathBuf,
    pub size: usize,
    pub content_type: String,
    pub received_at: DateTime<Utc>,
}

impl UploadedDocument {
    pub fn is_pdf(&self) -> bool {
        self.content_type == "application/pdf"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    TextLayer,
    Tesseract,
}

/// Plain text recognized in a document. Lives only for one pipeline run.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    pub method: ExtractionMethod,
}

/// The instruction sent to the provider, with the document text interpolated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPrompt {
    pub text: String,
    pub fields: Vec<String>,
}

/// Which response envelope the configured provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderContract {
    /// `choices[0].message.content` carries a JSON object as text.
    #[default]
    ChatCompletions,
    /// The body already holds `parsed_data`, `classification_data` and the
    /// three case-detail arrays.
    Structured,
}

/// The raw answer of the provider for the attempt that succeeded.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
    pub attempts: u32,
}

/// The six claim fields extracted from a document.
///
/// Any field may be missing from the provider output, so all of them are
/// optional. Serialization always emits the six canonical keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimExtraction {
    #[serde(rename = "Petitioner name")]
    pub petitioner_name: Option<String>,
    #[serde(rename = "Petitioner Advocate")]
    pub petitioner_advocate: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "District")]
    pub district: Option<String>,
    #[serde(rename = "Court Complex")]
    pub court_complex: Option<String>,
    #[serde(rename = "Claim Amount")]
    pub claim_amount: Option<String>,
}

impl ClaimExtraction {
    /// Number of fields the provider actually filled in.
    pub fn present_fields(&self) -> usize {
        [
            &self.petitioner_name,
            &self.petitioner_advocate,
            &self.state,
            &self.district,
            &self.court_complex,
            &self.claim_amount,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }
}

/// Personal details of the petitioner, requested by the extended prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PetitionerProfile {
    #[serde(rename = "Age of Petitioner")]
    pub age: Option<String>,
    #[serde(rename = "Occupation of Petitioner")]
    pub occupation: Option<String>,
    #[serde(rename = "Dependents of Petitioner")]
    pub dependents: Option<String>,
    #[serde(rename = "Summary")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FraudClassification {
    #[serde(rename = "Fraud Analysis")]
    pub fraud_analysis: Option<String>,
    #[serde(rename = "Reasoning")]
    pub reasoning: Vec<String>,
    #[serde(rename = "Fraud Flag")]
    pub fraud_flag: Option<bool>,
}

/// A court case related to the claim, as returned by the structured provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseDetailRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub case_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub case_year: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub petitioner: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub respondent: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub unique_case_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub cnr: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub state: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub district: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub court_complex: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub case_type: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub filing_date: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub regi_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub first_hearing_date: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub decision_date: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub hearing_count: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub nature_of_disposal: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub court_number_and_judge: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub petitioner_advocate: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub respondent_advocate: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub under_act: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub under_section: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub incident_details: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub claim_amount: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub settlement_amount: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub interest_rate: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub payment_mode: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub judge_name: Option<String>,
    #[serde(alias = "summary_of_pdf", deserialize_with = "lenient::string")]
    pub summary: Option<String>,
}

/// A case-detail record with the synthetic row id used by the result tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseDetailRow {
    pub id: usize,
    #[serde(flatten)]
    pub record: CaseDetailRecord,
}

/// The normalized outcome of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedExtraction {
    pub parsed_data: ClaimExtraction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub petitioner_profile: Option<PetitionerProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_data: Option<FraudClassification>,
    pub petitioner_case_details: Vec<CaseDetailRow>,
    pub advocate_case_details: Vec<CaseDetailRow>,
    pub common_case_details: Vec<CaseDetailRow>,
}
