//! Error types for shelf-schema

/// Result type for shelf-schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving categories, field keys and templates
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A content category name that is not part of the closed set
    #[error("Unsupported content category: {name}")]
    UnsupportedCategory { name: String },

    /// A field key name that does not exist at all
    #[error("Unsupported field: {name}")]
    UnsupportedField { name: String },

    /// A known field key that has no template for the given category
    #[error("Field {key} is not supported for category {category}")]
    FieldNotInCategory { key: String, category: String },
}

/// A value that could not be converted into the destination value model
///
/// Conversion failures are data errors: the offending field is omitted
/// from the payload and the record is still synchronized.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Cannot convert {field}: {reason}")]
pub struct ConversionError {
    pub field: String,
    pub reason: String,
}

impl ConversionError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
