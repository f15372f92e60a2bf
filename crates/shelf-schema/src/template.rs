//! Field templates describing destination columns

use serde::{Deserialize, Serialize};

use crate::field::FieldKey;

/// Value type of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    SingleSelect,
    DateTime,
    Url,
}

impl FieldKind {
    /// Numeric type code used on the destination wire format.
    pub fn type_code(&self) -> u16 {
        match self {
            FieldKind::Text => 1,
            FieldKind::Number => 2,
            FieldKind::SingleSelect => 3,
            FieldKind::DateTime => 5,
            FieldKind::Url => 15,
        }
    }

    pub fn from_type_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(FieldKind::Text),
            2 => Some(FieldKind::Number),
            3 => Some(FieldKind::SingleSelect),
            5 => Some(FieldKind::DateTime),
            15 => Some(FieldKind::Url),
            _ => None,
        }
    }
}

/// Option of a single-select column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub name: String,
    pub color: u8,
}

impl SelectOption {
    pub fn new(name: impl Into<String>, color: u8) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// Type-specific column configuration.
///
/// Only the properties relevant to the column's kind are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldProperty {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_wrap: Option<bool>,
}

impl FieldProperty {
    pub fn is_empty(&self) -> bool {
        *self == FieldProperty::default()
    }
}

/// Canonical description of one destination column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTemplate {
    /// Abstract key the column stores
    pub key: FieldKey,
    /// Logical column name, matched case-sensitively
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "FieldProperty::is_empty")]
    pub property: FieldProperty,
}

impl FieldTemplate {
    pub fn text(key: FieldKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            kind: FieldKind::Text,
            property: FieldProperty::default(),
        }
    }

    /// Long free text that wraps in the destination grid.
    pub fn long_text(key: FieldKey, name: impl Into<String>) -> Self {
        let mut template = Self::text(key, name);
        template.property.auto_wrap = Some(true);
        template
    }

    pub fn number(key: FieldKey, name: impl Into<String>, formatter: &str) -> Self {
        Self {
            key,
            name: name.into(),
            kind: FieldKind::Number,
            property: FieldProperty {
                formatter: Some(formatter.to_string()),
                ..FieldProperty::default()
            },
        }
    }

    /// Number column with an inclusive range, e.g. a star rating.
    pub fn rating(key: FieldKey, name: impl Into<String>, min: f64, max: f64, formatter: &str) -> Self {
        let mut template = Self::number(key, name, formatter);
        template.property.min = Some(min);
        template.property.max = Some(max);
        template
    }

    pub fn single_select(key: FieldKey, name: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self {
            key,
            name: name.into(),
            kind: FieldKind::SingleSelect,
            property: FieldProperty {
                options,
                ..FieldProperty::default()
            },
        }
    }

    pub fn date_time(key: FieldKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            kind: FieldKind::DateTime,
            property: FieldProperty {
                date_format: Some("yyyy/MM/dd".to_string()),
                ..FieldProperty::default()
            },
        }
    }

    pub fn url(key: FieldKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            kind: FieldKind::Url,
            property: FieldProperty::default(),
        }
    }
}
