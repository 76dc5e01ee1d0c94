//! Structured payload extraction from model responses

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

/// Model output that could not be turned into the expected shape
///
/// Never escapes a step: each step maps it to its own fallback.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected JSON shape: {0}")]
    Shape(String),
}

/// Remove a surrounding code fence, optionally tagged `json`
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.find(FENCE) {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

/// Trim, unwrap a code fence and parse the remainder as JSON
pub fn extract_structured_payload(text: &str) -> Result<Value, ExtractError> {
    Ok(serde_json::from_str(strip_code_fence(text))?)
}

/// Like [`extract_structured_payload`], deserializing into `T`
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    let value = extract_structured_payload(text)?;
    serde_json::from_value(value).map_err(|e| ExtractError::Shape(e.to_string()))
}
