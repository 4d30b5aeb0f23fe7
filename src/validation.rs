//! Input validation for Taskforge
//!
//! Guards JSONB payloads (navigation payloads, extracted information, error
//! lists) against oversized or malformed data and checks task URLs before
//! they are persisted.

use crate::error::{Result, TaskforgeError};
use serde_json::{Map, Value};
use url::Url;

/// Maximum allowed size for JSONB payloads (1MB)
const MAX_JSON_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum nesting depth for JSON objects/arrays
const MAX_JSON_DEPTH: usize = 10;

/// Maximum number of keys in a JSON object
const MAX_JSON_KEYS: usize = 1000;

/// Maximum string length for JSON string values
const MAX_JSON_STRING_LENGTH: usize = 10000;

/// Validates JSONB input for size and structure constraints
pub fn validate_jsonb_input(field: &str, value: &Value) -> Result<()> {
    let serialized = serde_json::to_string(value)?;

    if serialized.len() > MAX_JSON_SIZE_BYTES {
        return Err(TaskforgeError::InvalidInput(format!(
            "{field}: JSON payload too large: {} bytes (max: {MAX_JSON_SIZE_BYTES})",
            serialized.len(),
        )));
    }

    validate_json_depth(field, value, 0)
}

fn validate_json_depth(field: &str, value: &Value, current_depth: usize) -> Result<()> {
    if current_depth > MAX_JSON_DEPTH {
        return Err(TaskforgeError::InvalidInput(format!(
            "{field}: JSON nesting too deep: {current_depth} (max: {MAX_JSON_DEPTH})"
        )));
    }

    match value {
        Value::Object(map) => {
            if map.len() > MAX_JSON_KEYS {
                return Err(TaskforgeError::InvalidInput(format!(
                    "{field}: too many JSON keys: {} (max: {MAX_JSON_KEYS})",
                    map.len(),
                )));
            }

            for (key, val) in map {
                let key_chars = key.chars().count();
                if key_chars > MAX_JSON_STRING_LENGTH {
                    return Err(TaskforgeError::InvalidInput(format!(
                        "{field}: JSON key too long: {key_chars} chars (max: {MAX_JSON_STRING_LENGTH})"
                    )));
                }
                validate_json_depth(field, val, current_depth + 1)?;
            }
        }
        Value::Array(arr) => {
            if arr.len() > MAX_JSON_KEYS {
                return Err(TaskforgeError::InvalidInput(format!(
                    "{field}: JSON array too large: {} items (max: {MAX_JSON_KEYS})",
                    arr.len(),
                )));
            }

            for item in arr {
                validate_json_depth(field, item, current_depth + 1)?;
            }
        }
        Value::String(s) => {
            let chars = s.chars().count();
            if chars > MAX_JSON_STRING_LENGTH {
                return Err(TaskforgeError::InvalidInput(format!(
                    "{field}: JSON string too long: {chars} chars (max: {MAX_JSON_STRING_LENGTH})"
                )));
            }
        }
        _ => {}
    }

    Ok(())
}

/// Validates the error list recorded on a task; every entry must be an object
pub fn validate_task_errors(errors: &[Value]) -> Result<()> {
    for (index, entry) in errors.iter().enumerate() {
        if !entry.is_object() {
            return Err(TaskforgeError::InvalidInput(format!(
                "errors[{index}] must be a JSON object"
            )));
        }
        validate_jsonb_input("errors", entry)?;
    }
    Ok(())
}

/// Validates a task URL and returns its normalized form
///
/// Only http and https URLs with a host are accepted.
pub fn validate_url(field: &str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskforgeError::InvalidInput(format!("{field} cannot be empty")));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| TaskforgeError::InvalidInput(format!("Invalid {field} '{trimmed}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(TaskforgeError::InvalidInput(format!(
                "Invalid {field} '{trimmed}': unsupported scheme {other}"
            )))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(TaskforgeError::InvalidInput(format!(
            "Invalid {field} '{trimmed}': missing host"
        )));
    }

    Ok(parsed.to_string())
}

/// Sanitizes JSON input by stripping NUL characters, which PostgreSQL text rejects
pub fn sanitize_json(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace('\0', "")),
        Value::Array(arr) => Value::Array(arr.into_iter().map(sanitize_json).collect()),
        Value::Object(map) => {
            let sanitized: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k.replace('\0', ""), sanitize_json(v)))
                .collect();
            Value::Object(sanitized)
        }
        other => other,
    }
}
