//! Destination table collaborator
//!
//! The destination's HTTP client lives outside this crate; the engine only
//! talks to it through [`Destination`].

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use shelf_schema::{CellValue, FieldKind, FieldProperty, FieldTemplate};
use shelf_store::TableRef;

/// Column id to cell value, as read from or written to one destination row.
pub type Cells = BTreeMap<String, CellValue>;

/// Per-call authentication for the destination.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    app_secret: String,
}

impl Credentials {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    pub fn app_secret(&self) -> &str {
        &self.app_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// A live destination column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: String,
    pub name: String,
    pub type_code: u16,
    pub property: FieldProperty,
}

impl Column {
    /// Kind of the column, if its type code is one we model.
    pub fn kind(&self) -> Option<FieldKind> {
        FieldKind::from_type_code(self.type_code)
    }
}

/// Column definition sent on create or update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "FieldProperty::is_empty")]
    pub property: FieldProperty,
}

impl ColumnSpec {
    pub fn type_code(&self) -> u16 {
        self.kind.type_code()
    }
}

impl From<&FieldTemplate> for ColumnSpec {
    fn from(template: &FieldTemplate) -> Self {
        Self {
            name: template.name.clone(),
            kind: template.kind,
            property: template.property.clone(),
        }
    }
}

/// A row in the destination table.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRecord {
    pub record_id: String,
    pub cells: Cells,
}

impl DestinationRecord {
    pub fn new(record_id: impl Into<String>, cells: Cells) -> Self {
        Self {
            record_id: record_id.into(),
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: usize,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<DestinationRecord>,
    pub next_page_token: Option<String>,
    pub has_more: bool,
}

/// Field update for one existing row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub record_id: String,
    pub cells: Cells,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limit, timeout; may succeed on a later run
    Transient,
    Permanent,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transient => write!(f, "transient"),
            ErrorKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Failure reported by the destination collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} destination error: {message}")]
pub struct DestinationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DestinationError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

pub type DestinationResult<T> = std::result::Result<T, DestinationError>;

/// Mutation interface of the destination table.
///
/// Implementations own authentication and any HTTP-level retries. Every call
/// is a suspension point for the run.
#[async_trait]
pub trait Destination: Send + Sync {
    async fn list_records(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        page: PageRequest,
    ) -> DestinationResult<RecordPage>;

    /// Insert rows, returning the new record ids in input order.
    async fn insert_records(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        rows: Vec<Cells>,
    ) -> DestinationResult<Vec<String>>;

    async fn update_records(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        updates: Vec<RecordUpdate>,
    ) -> DestinationResult<()>;

    async fn delete_record(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        record_id: &str,
    ) -> DestinationResult<()>;

    async fn list_columns(
        &self,
        credentials: &Credentials,
        table: &TableRef,
    ) -> DestinationResult<Vec<Column>>;

    async fn create_column(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        spec: &ColumnSpec,
    ) -> DestinationResult<Column>;

    async fn update_column(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        column_id: &str,
        spec: &ColumnSpec,
    ) -> DestinationResult<Column>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials::new("cli_a1", "s3cret");
        let shown = format!("{creds:?}");
        assert!(shown.contains("cli_a1"));
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn column_kind_follows_type_code() {
        let column = Column {
            id: "fldAbc".into(),
            name: "Title".into(),
            type_code: 15,
            property: FieldProperty::default(),
        };
        assert_eq!(column.kind(), Some(FieldKind::Url));
    }
}
