//! Tolerant conversions for provider values that may arrive as strings,
//! numbers, booleans, placeholders or not at all.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Converts a scalar JSON value into a trimmed string.
///
/// `null`, empty strings and the `NA` / `N/A` placeholders become `None`.
/// Arrays of scalars are joined with `, `; objects are dropped.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Null | Value::Object(_) => None,
    }
}

pub fn scalar_to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "fraud" | "fraudulent" => Some(true),
            "false" | "no" | "n" | "0" | "not fraud" | "genuine" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Splits point-wise reasoning into individual points.
///
/// Accepts an array of scalars or a single string with one point per line;
/// list markers (`-`, `*`, `•`, `1.`, `2)`) are stripped.
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::String(s) => s
            .lines()
            .map(strip_list_marker)
            .filter_map(clean)
            .collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

/// Lower-cases a key and keeps only its alphanumeric characters, so that
/// `Petitioner Name`, `petitioner_name` and `petitionerName` compare equal.
pub fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// `deserialize_with` helper for optional string fields.
pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

fn clean(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("n/a")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start();
    let line = line.trim_start_matches(['-', '*', '•']);
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped;
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholders_are_absent() {
        assert_eq!(scalar_to_string(&json!("NA")), None);
        assert_eq!(scalar_to_string(&json!("  ")), None);
        assert_eq!(scalar_to_string(&json!(null)), None);
        assert_eq!(scalar_to_string(&json!(50000)), Some("50000".to_string()));
    }

    #[test]
    fn reasoning_lines_lose_their_markers() {
        let points = string_list(&json!("1. Claim filed late\n- Amount inflated\n\n* No witnesses"));
        assert_eq!(
            points,
            vec!["Claim filed late", "Amount inflated", "No witnesses"]
        );
    }

    #[test]
    fn canonical_keys_ignore_case_and_punctuation() {
        assert_eq!(canonical_key("Petitioner Name"), "petitionername");
        assert_eq!(canonical_key("petitioner_name"), "petitionername");
        assert_eq!(canonical_key("Claim Amount extract"), "claimamountextract");
    }
}
