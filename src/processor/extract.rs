//! Recovery of a string array from raw completion text.
//!
//! Completions are asked for a bare JSON array, but models wrap output in
//! prose or markdown fences often enough that parsing happens in two
//! stages:
//!
//! 1. strict: parse the whole (trimmed) text as JSON;
//! 2. fallback: extract a fenced ```json block or the outermost
//!    bracket-delimited substring and parse that.
//!
//! Whatever parses must be a JSON array; scalars and objects are rejected.
//! Normalization to a fixed-length `Vec<String>` is separate and never
//! fails.

use anyhow::{bail, Result};
use serde_json::Value;

/// Parse completion text into a JSON array, recovering from surrounding
/// prose or code fences.
pub fn parse_value_array(text: &str) -> Result<Vec<Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        bail!("empty completion text");
    }

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(items);
    }

    let Some(candidate) = extract_array_text(trimmed) else {
        bail!("no JSON array found in completion text");
    };

    match serde_json::from_str::<Value>(&candidate) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => bail!("recovered JSON is not an array: {}", kind_of(&other)),
        Err(e) => bail!("failed to parse recovered JSON array: {}", e),
    }
}

/// Locate an array-shaped substring inside free-form text.
pub fn extract_array_text(text: &str) -> Option<String> {
    // Try to find ```json ... ``` blocks
    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            let inner = text[content_start..content_start + end].trim();
            if !inner.is_empty() {
                return Some(inner.to_string());
            }
        }
    }

    // Outermost [ ... ]
    if let Some(start) = text.find('[') {
        if let Some(end) = text.rfind(']') {
            if end > start {
                return Some(text[start..=end].to_string());
            }
        }
    }

    None
}

/// Convert parsed elements to strings and force the result to `expected`
/// entries: excess elements are dropped, missing ones become empty strings.
pub fn normalize_values(items: Vec<Value>, expected: usize) -> Vec<String> {
    let mut values: Vec<String> = items
        .into_iter()
        .take(expected)
        .map(|v| value_to_string(&v))
        .collect();
    values.resize(expected, String::new());
    values
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // Nested structures are kept as JSON text
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
