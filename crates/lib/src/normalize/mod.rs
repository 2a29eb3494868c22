//! # Response Normalizer
//!
//! Maps the provider's answer onto [`NormalizedExtraction`]. The envelope
//! shape is chosen by the configured [`ProviderContract`], never guessed from
//! the body.

pub mod lenient;

use crate::{
    errors::IntakeError,
    types::{
        CaseDetailRecord, CaseDetailRow, ClaimExtraction, FraudClassification,
        NormalizedExtraction, PetitionerProfile, ProviderContract,
    },
};
use lenient::{canonical_key, scalar_to_bool, scalar_to_string, string_list};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Normalizes a provider body according to its contract.
pub fn normalize(
    contract: ProviderContract,
    body: &Value,
) -> Result<NormalizedExtraction, IntakeError> {
    match contract {
        ProviderContract::ChatCompletions => normalize_chat_completion(body),
        ProviderContract::Structured => normalize_structured(body),
    }
}

/// Locates the model's completion text at `choices[0].message.content`.
pub fn completion_text(body: &Value) -> Result<&str, IntakeError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            IntakeError::Normalization(
                "provider response has no choices[0].message.content".to_string(),
            )
        })
}

/// Pulls the JSON object out of a free-form completion.
///
/// A fenced code block wins if present; otherwise the text between the first
/// `{` and the last `}` is parsed.
pub fn parse_completion_object(completion: &str) -> Result<Map<String, Value>, IntakeError> {
    let candidate = fenced_block(completion).unwrap_or(completion);
    let (start, end) = match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(IntakeError::Normalization(
                "completion does not contain a JSON object".to_string(),
            ))
        }
    };

    match serde_json::from_str::<Value>(&candidate[start..=end])? {
        Value::Object(map) => Ok(map),
        _ => Err(IntakeError::Normalization(
            "completion JSON is not an object".to_string(),
        )),
    }
}

fn normalize_chat_completion(body: &Value) -> Result<NormalizedExtraction, IntakeError> {
    let completion = completion_text(body)?;
    debug!(completion = %completion, "<-- Completion from provider");
    let object = parse_completion_object(completion)?;
    let parsed_data = ClaimExtraction::from_object(&object);
    if parsed_data.present_fields() == 0 {
        warn!("Completion parsed but none of the claim fields were present.");
    }

    Ok(NormalizedExtraction {
        parsed_data,
        ..Default::default()
    })
}

#[derive(Deserialize)]
struct StructuredEnvelope {
    #[serde(default)]
    parsed_data: Option<Map<String, Value>>,
    #[serde(default)]
    classification_data: Option<Map<String, Value>>,
    #[serde(default)]
    petitioner_case_details: Option<Vec<CaseDetailRecord>>,
    #[serde(default)]
    advocate_case_details: Option<Vec<CaseDetailRecord>>,
    #[serde(default)]
    common_case_details: Option<Vec<CaseDetailRecord>>,
}

fn normalize_structured(body: &Value) -> Result<NormalizedExtraction, IntakeError> {
    if !body.is_object() {
        return Err(IntakeError::Normalization(
            "structured provider response is not a JSON object".to_string(),
        ));
    }
    let envelope: StructuredEnvelope = serde_json::from_value(body.clone())?;
    let parsed = envelope.parsed_data.unwrap_or_default();

    Ok(NormalizedExtraction {
        parsed_data: ClaimExtraction::from_object(&parsed),
        petitioner_profile: PetitionerProfile::from_object(&parsed),
        classification_data: envelope
            .classification_data
            .as_ref()
            .and_then(FraudClassification::from_object),
        petitioner_case_details: number_rows(envelope.petitioner_case_details),
        advocate_case_details: number_rows(envelope.advocate_case_details),
        common_case_details: number_rows(envelope.common_case_details),
    })
}

/// Assigns 1-based row ids in array order; the provider supplies none.
fn number_rows(records: Option<Vec<CaseDetailRecord>>) -> Vec<CaseDetailRow> {
    records
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, record)| CaseDetailRow {
            id: index + 1,
            record,
        })
        .collect()
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip an optional language tag such as ```json.
    let body_start = after_open.find('\n').map_or(0, |i| i + 1);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Fills `slot` with the first present value among the keys it accepts.
fn assign(slot: &mut Option<String>, value: &Value) {
    if slot.is_none() {
        *slot = scalar_to_string(value);
    }
}

impl ClaimExtraction {
    /// Builds the record from any JSON object, matching keys loosely and
    /// ignoring keys outside the six claim fields.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut claim = ClaimExtraction::default();
        for (key, value) in object {
            match canonical_key(key).as_str() {
                "petitionername" | "nameofpetitioner" | "petitioner" => {
                    assign(&mut claim.petitioner_name, value)
                }
                "petitioneradvocate" | "advocateofpetitioner" | "advocate" => {
                    assign(&mut claim.petitioner_advocate, value)
                }
                "state" => assign(&mut claim.state, value),
                "district" => assign(&mut claim.district, value),
                "courtcomplex" => assign(&mut claim.court_complex, value),
                "claimamount" | "claimamountextract" => assign(&mut claim.claim_amount, value),
                _ => {}
            }
        }
        claim
    }
}

impl PetitionerProfile {
    /// Returns `None` when the object carries none of the profile fields.
    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let mut profile = PetitionerProfile::default();
        for (key, value) in object {
            match canonical_key(key).as_str() {
                "ageofpetitioner" | "age" => assign(&mut profile.age, value),
                "occupationofpetitioner" | "occupation" => assign(&mut profile.occupation, value),
                "dependentsofpetitioner" | "dependents" => assign(&mut profile.dependents, value),
                "summary" => assign(&mut profile.summary, value),
                _ => {}
            }
        }
        (profile != PetitionerProfile::default()).then_some(profile)
    }
}

impl FraudClassification {
    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let mut classification = FraudClassification::default();
        for (key, value) in object {
            match canonical_key(key).as_str() {
                "fraudanalysis" => assign(&mut classification.fraud_analysis, value),
                "reasoning" if classification.reasoning.is_empty() => {
                    classification.reasoning = string_list(value)
                }
                "fraudflag" if classification.fraud_flag.is_none() => {
                    classification.fraud_flag = scalar_to_bool(value)
                }
                _ => {}
            }
        }
        (classification != FraudClassification::default()).then_some(classification)
    }
}
