//! Field bindings: abstract field key to destination column id

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use shelf_schema::{ContentCategory, FieldKey};

use crate::error::{Error, Result};

/// Current binding layout version.
pub const SCHEMA_VERSION: u32 = 1;

/// Keys every binding must resolve.
pub const REQUIRED_FIELDS: &[FieldKey] = &[FieldKey::SubjectId];

static COLUMN_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^fld[A-Za-z0-9]{2,}$").unwrap());

/// Whether `id` has the destination's column identifier format.
pub fn is_valid_column_id(id: &str) -> bool {
    COLUMN_ID_PATTERN.is_match(id)
}

/// A destination table, identified by its app and table tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub app_token: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(app_token: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            app_token: app_token.into(),
            table_id: table_id.into(),
        }
    }

    /// Key used in the persisted configuration layout.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.app_token, self.table_id)
    }

    /// Parse a `"<app>:<table>"` storage key.
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (app, table) = key.split_once(':')?;
        if app.is_empty() || table.is_empty() {
            return None;
        }
        Some(Self::new(app, table))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.app_token, self.table_id)
    }
}

/// Resolved mapping for one (user, destination table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBinding {
    pub fields: BTreeMap<FieldKey, String>,
    pub category: ContentCategory,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FieldBinding {
    pub fn new(
        category: ContentCategory,
        fields: BTreeMap<FieldKey, String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            fields,
            category,
            schema_version: SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    /// Column id bound to `key`.
    pub fn column_for(&self, key: FieldKey) -> Option<&str> {
        self.fields.get(&key).map(String::as_str)
    }

    /// Reverse lookup from column id to field key.
    pub fn key_for_column(&self, column_id: &str) -> Option<FieldKey> {
        self.fields
            .iter()
            .find(|(_, id)| id.as_str() == column_id)
            .map(|(key, _)| *key)
    }

    pub fn subject_column(&self) -> Option<&str> {
        self.column_for(FieldKey::SubjectId)
    }

    /// Column id to field key, for reverse-mapping destination records.
    pub fn reverse(&self) -> BTreeMap<&str, FieldKey> {
        self.fields
            .iter()
            .map(|(key, id)| (id.as_str(), *key))
            .collect()
    }

    /// Reject bindings that could not drive a sync.
    pub fn validate(&self) -> Result<()> {
        for required in REQUIRED_FIELDS {
            if !self.fields.contains_key(required) {
                return Err(Error::invalid(format!("missing required field {required}")));
            }
        }
        for (key, id) in &self.fields {
            if !is_valid_column_id(id) {
                return Err(Error::invalid(format!(
                    "column id '{id}' for {key} is not a valid column identifier"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(fields: &[(FieldKey, &str)]) -> FieldBinding {
        FieldBinding::new(
            ContentCategory::Book,
            fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            Utc::now(),
        )
    }

    #[test]
    fn valid_binding_passes() {
        let b = binding(&[(FieldKey::SubjectId, "fldSubj01"), (FieldKey::Title, "fldTitle1")]);
        assert!(b.validate().is_ok());
        assert_eq!(b.subject_column(), Some("fldSubj01"));
        assert_eq!(b.key_for_column("fldTitle1"), Some(FieldKey::Title));
    }

    #[test]
    fn missing_subject_is_rejected() {
        let b = binding(&[(FieldKey::Title, "fldTitle1")]);
        let err = b.validate().unwrap_err();
        assert!(err.to_string().contains("subject_id"), "{err}");
    }

    #[test]
    fn malformed_column_id_is_rejected() {
        let b = binding(&[(FieldKey::SubjectId, "Subject ID")]);
        assert!(matches!(b.validate(), Err(Error::InvalidBinding { .. })));
    }

    #[test]
    fn storage_key_round_trips() {
        let table = TableRef::new("bascnApp", "tblBooks");
        assert_eq!(table.storage_key(), "bascnApp:tblBooks");
        assert_eq!(TableRef::from_storage_key("bascnApp:tblBooks"), Some(table));
        assert_eq!(TableRef::from_storage_key("nocolon"), None);
    }
}
