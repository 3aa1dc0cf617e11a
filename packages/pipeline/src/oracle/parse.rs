//! Reply parsing and the candidate schema gate.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::ExtractionError;
use crate::types::{CandidateProject, ProjectStatus};

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)\r?\n?[ \t]*```").expect("fenced block pattern is valid")
});

/// What a model reply contained.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    /// No fenced JSON block at all
    Missing,
    /// The block held `null`: the document describes no project
    NoProject,
    /// A JSON object to validate
    Object(Map<String, Value>),
}

/// Body of the first fenced ```json block in `reply`.
pub fn fenced_block(reply: &str) -> Option<&str> {
    FENCED_JSON
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Parse a reply's fenced payload.
///
/// A missing block is not an error. A block that is not valid JSON, or is
/// JSON but neither an object nor `null`, is.
pub fn parse_reply(reply: &str) -> Result<ReplyPayload, ExtractionError> {
    let Some(block) = fenced_block(reply) else {
        return Ok(ReplyPayload::Missing);
    };

    match serde_json::from_str::<Value>(block)? {
        Value::Null => Ok(ReplyPayload::NoProject),
        Value::Object(map) => Ok(ReplyPayload::Object(map)),
        other => Err(ExtractionError::Validation {
            errors: vec![format!("expected a JSON object, got {}", json_kind(&other))],
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate a payload against the candidate schema and attach its source.
///
/// Every violation is collected, so one failure reports all bad fields.
pub fn validate_candidate(
    payload: &Map<String, Value>,
    source_url: &str,
) -> Result<CandidateProject, ExtractionError> {
    let mut errors = Vec::new();

    let status = match payload.get("status") {
        None | Some(Value::Null) => {
            errors.push("status: required".to_string());
            None
        }
        Some(Value::String(s)) => {
            let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
            match normalized.parse::<ProjectStatus>() {
                Ok(status) => Some(status),
                Err(e) => {
                    errors.push(format!("status: {e}"));
                    None
                }
            }
        }
        Some(other) => {
            errors.push(format!("status: expected string, got {}", json_kind(other)));
            None
        }
    };

    let name = optional_text(payload, "name", &mut errors);
    let developer = optional_text(payload, "developer", &mut errors);
    let address = optional_text(payload, "address", &mut errors);
    let size_sqft = optional_positive(payload, &["sizeSqft", "sqft"], &mut errors);
    let power_mw = optional_positive(payload, &["powerMw"], &mut errors);
    let filing_date = optional_date(payload, "filingDate", &mut errors);
    let estimated_completion_date = optional_date(payload, "estimatedCompletionDate", &mut errors);

    match status {
        Some(status) if errors.is_empty() => Ok(CandidateProject {
            name,
            status,
            developer,
            size_sqft,
            power_mw,
            address,
            filing_date,
            estimated_completion_date,
            source_documents: vec![source_url.to_string()],
        }),
        _ => Err(ExtractionError::Validation { errors }),
    }
}

fn optional_text(payload: &Map<String, Value>, key: &str, errors: &mut Vec<String>) -> Option<String> {
    match payload.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(other) => {
            errors.push(format!("{key}: expected string, got {}", json_kind(other)));
            None
        }
    }
}

fn optional_positive(payload: &Map<String, Value>, keys: &[&str], errors: &mut Vec<String>) -> Option<f64> {
    let (key, value) = keys
        .iter()
        .find_map(|k| payload.get(*k).filter(|v| !v.is_null()).map(|v| (*k, v)))?;

    match value.as_f64() {
        Some(n) if n.is_finite() && n > 0.0 => Some(n),
        Some(n) => {
            errors.push(format!("{key}: must be a positive number, got {n}"));
            None
        }
        None => {
            errors.push(format!("{key}: expected number, got {}", json_kind(value)));
            None
        }
    }
}

fn optional_date(payload: &Map<String, Value>, key: &str, errors: &mut Vec<String>) -> Option<NaiveDate> {
    match payload.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => match parse_date(s.trim()) {
            Some(date) => Some(date),
            None => {
                errors.push(format!("{key}: invalid date {s:?}"));
                None
            }
        },
        Some(other) => {
            errors.push(format!("{key}: expected date string, got {}", json_kind(other)));
            None
        }
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
