//! Content records produced by the content source

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::ContentCategory;
use crate::field::FieldKey;
use crate::value::FieldValue;

/// One catalog item, keyed by its subject id.
///
/// The engine never mutates content records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub subject_id: String,
    pub category: ContentCategory,
    #[serde(default)]
    pub attributes: BTreeMap<FieldKey, FieldValue>,
}

impl ContentRecord {
    pub fn new(subject_id: impl Into<String>, category: ContentCategory) -> Self {
        Self {
            subject_id: subject_id.into(),
            category,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute (builder pattern).
    pub fn with(mut self, key: FieldKey, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(key, value.into());
        self
    }

    /// Subject id with surrounding whitespace removed, if non-empty.
    pub fn subject(&self) -> Option<&str> {
        let id = self.subject_id.trim();
        (!id.is_empty()).then_some(id)
    }

    /// Value for `key`; the subject id is served from the record identity.
    pub fn value(&self, key: FieldKey) -> Option<FieldValue> {
        if key == FieldKey::SubjectId {
            return self.subject().map(FieldValue::from);
        }
        self.attributes.get(&key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_is_exposed_as_a_field() {
        let record = ContentRecord::new(" B1 ", ContentCategory::Book).with(FieldKey::Title, "X");
        assert_eq!(record.subject(), Some("B1"));
        assert_eq!(record.value(FieldKey::SubjectId), Some(FieldValue::from("B1")));
        assert_eq!(record.value(FieldKey::Title), Some(FieldValue::from("X")));
        assert_eq!(record.value(FieldKey::Author), None);
    }

    #[test]
    fn blank_subject_id_is_none() {
        let record = ContentRecord::new("  ", ContentCategory::Game);
        assert_eq!(record.subject(), None);
        assert_eq!(record.value(FieldKey::SubjectId), None);
    }
}
