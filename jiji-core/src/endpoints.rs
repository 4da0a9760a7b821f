//! Codec for the store's `endpoints` column: a JSON array of strings.
//!
//! The store has no array column type, so ordered endpoint lists are
//! stored as JSON text. This module is the single place that (de)serializes
//! that text, matching the "single sanctioned method" discipline applied
//! to SQL quoting in [`crate::validators`].

/// Parses a JSON string array of endpoints.
///
/// Malformed JSON yields an empty list; non-string elements are silently
/// filtered out rather than failing the whole parse, so that one bad
/// element sourced from a stale or partially-written row doesn't discard
/// otherwise-usable endpoints.
#[must_use]
pub fn parse_endpoints(raw: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Serializes a list of endpoints back to the store's JSON array form.
#[must_use]
pub fn encode_endpoints(endpoints: &[String]) -> String {
    serde_json::to_string(endpoints).unwrap_or_else(|_| "[]".to_string())
}
