//! Content hashing for change detection
//!
//! Both sides of a comparison are hashed from the destination value model:
//! content records after conversion, destination records after reverse
//! mapping column ids to field keys. Equal hashes mean "unchanged".

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use shelf_schema::{CellValue, FieldKey};

/// Separator between `key:value` pairs in the hash input.
pub const PAIR_DELIMITER: &str = "|";

const NULL: &str = "null";

/// Canonical string form of a cell value.
///
/// Blank text is treated as null, so values differing only in null versus
/// whitespace, surrounding whitespace or case normalize identically.
pub fn normalize(value: &CellValue) -> String {
    match value {
        CellValue::Null => NULL.to_string(),
        CellValue::Text(s) => normalize_text(s),
        CellValue::Number(n) => n.to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Timestamp(ms) => ms.to_string(),
        CellValue::Link { text, link } => {
            format!("{{link:{},text:{}}}", normalize_text(link), normalize_text(text))
        }
        CellValue::List(items) => {
            let mut parts: Vec<String> = items.iter().map(normalize).collect();
            parts.sort();
            format!("[{}]", parts.join(","))
        }
    }
}

fn normalize_text(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        NULL.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Hash input: `key:value` pairs sorted by key name, metadata excluded.
pub fn canonical_form(values: &BTreeMap<FieldKey, CellValue>) -> String {
    let mut pairs: Vec<(&'static str, String)> = values
        .iter()
        .filter(|(key, _)| !key.is_metadata())
        .map(|(key, value)| (key.as_str(), normalize(value)))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join(PAIR_DELIMITER)
}

/// SHA-256 hex digest of the canonical form.
pub fn content_hash(values: &BTreeMap<FieldKey, CellValue>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(values).as_bytes());
    format!("{:x}", hasher.finalize())
}
