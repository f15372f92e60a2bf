//! JSON file backend
//!
//! One document per user, holding every destination table configured by
//! that user:
//!
//! ```json
//! {
//!   "destinations": {
//!     "<app>:<table>": {
//!       "fieldBindings": { "subject_id": "fld..." },
//!       "contentCategory": "book",
//!       "schemaVersion": 1,
//!       "createdAt": "...",
//!       "updatedAt": "..."
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelf_schema::{ContentCategory, FieldKey};
use tracing::debug;

use crate::backend::BindingBackend;
use crate::binding::{FieldBinding, TableRef};
use crate::error::{Error, Result};
use crate::io::{WriteLock, read_optional, write_atomic};

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserDocument {
    #[serde(default)]
    destinations: BTreeMap<String, DestinationEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestinationEntry {
    field_bindings: BTreeMap<FieldKey, String>,
    content_category: ContentCategory,
    schema_version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&FieldBinding> for DestinationEntry {
    fn from(binding: &FieldBinding) -> Self {
        Self {
            field_bindings: binding.fields.clone(),
            content_category: binding.category,
            schema_version: binding.schema_version,
            created_at: binding.created_at,
            updated_at: binding.updated_at,
        }
    }
}

impl From<DestinationEntry> for FieldBinding {
    fn from(entry: DestinationEntry) -> Self {
        Self {
            fields: entry.field_bindings,
            category: entry.content_category,
            schema_version: entry.schema_version,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// Binding backend persisting one JSON document per user under `root`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Backend rooted in the platform config directory.
    pub fn in_config_dir() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| Error::Backend("no config directory on this platform".into()))?;
        Ok(Self::new(base.join("shelf-sync").join("bindings")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Document path for a user.
    ///
    /// The file name is the user id with every byte outside `[a-z0-9-]`
    /// written as `_xx` (lowercase hex), so distinct ids never share a
    /// document, even on case-insensitive filesystems.
    pub fn user_path(&self, user: &str) -> Result<PathBuf> {
        if user.trim().is_empty() {
            return Err(Error::invalid("user id must not be empty"));
        }
        Ok(self.root.join(format!("{}.json", encode_user(user))))
    }

    fn read_document(&self, path: &Path) -> Result<UserDocument> {
        match read_optional(path)? {
            Some(content) => serde_json::from_str(&content).map_err(|e| Error::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            None => Ok(UserDocument::default()),
        }
    }

    fn write_document(&self, path: &Path, document: &UserDocument) -> Result<()> {
        let content = serde_json::to_string_pretty(document)?;
        write_atomic(path, content.as_bytes())
    }
}

fn encode_user(user: &str) -> String {
    let mut encoded = String::with_capacity(user.len());
    for byte in user.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' => encoded.push(char::from(byte)),
            _ => encoded.push_str(&format!("_{byte:02x}")),
        }
    }
    encoded
}

impl BindingBackend for FileBackend {
    fn load(&self, user: &str, table: &TableRef) -> Result<Option<FieldBinding>> {
        let path = self.user_path(user)?;
        let mut document = self.read_document(&path)?;
        Ok(document
            .destinations
            .remove(&table.storage_key())
            .map(FieldBinding::from))
    }

    fn save(&self, user: &str, table: &TableRef, binding: &FieldBinding) -> Result<()> {
        let path = self.user_path(user)?;
        let _lock = WriteLock::acquire(&path)?;

        let mut document = self.read_document(&path)?;
        document
            .destinations
            .insert(table.storage_key(), DestinationEntry::from(binding));
        self.write_document(&path, &document)?;

        debug!(user, table = %table, path = %path.display(), "saved field binding");
        Ok(())
    }

    fn remove(&self, user: &str, table: &TableRef) -> Result<bool> {
        let path = self.user_path(user)?;
        let _lock = WriteLock::acquire(&path)?;

        let mut document = self.read_document(&path)?;
        let existed = document.destinations.remove(&table.storage_key()).is_some();
        if existed {
            self.write_document(&path, &document)?;
        }
        Ok(existed)
    }
}
