//! Deterministic mock-mode results, for integration tests and local
//! development without upstream cost.

use serde_json::Value;

use crate::config::MockPolicy;

/// Substrings that mark a major as an engineering discipline. Matched
/// case-insensitively anywhere in the field.
const ENGINEERING_TERMS: &[&str] = &[
    "engineering",
    "engineer",
    "computer science",
    "civil",
    "mechanical",
    "electrical",
    "chemical",
    "aerospace",
    "software",
    "mechatronics",
    "robotics",
];

pub fn mock_values(policy: MockPolicy, rows: &[Value]) -> Vec<String> {
    match policy {
        MockPolicy::Placeholder => placeholder_values(rows.len()),
        MockPolicy::Classifier => rows.iter().map(classify_row).collect(),
    }
}

/// Index-tagged marker per row, derived from the row count alone.
pub fn placeholder_values(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("mock-row-{}", i)).collect()
}

/// Label a major as "Engineer" or "Non-Engineer" by keyword membership.
pub fn classify_major(major: &str) -> &'static str {
    let lower = major.to_lowercase();
    if ENGINEERING_TERMS.iter().any(|term| lower.contains(term)) {
        "Engineer"
    } else {
        "Non-Engineer"
    }
}

fn classify_row(row: &Value) -> String {
    let major = row.get("major").and_then(Value::as_str).unwrap_or_default();
    classify_major(major).to_string()
}
