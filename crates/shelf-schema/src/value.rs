//! Source and destination value models and the conversion between them
//!
//! Source attributes are loosely typed; they enter the system as a closed
//! [`FieldValue`] and leave it as a [`CellValue`] shaped by the column kind.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::ContentCategory;
use crate::error::ConversionError;
use crate::field::FieldKey;
use crate::template::{FieldKind, FieldTemplate};

/// Attribute value as produced by the content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    List(Vec<String>),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(d: DateTime<Utc>) -> Self {
        FieldValue::Date(d)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        FieldValue::List(v)
    }
}

/// Cell value in the destination's value model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    Link { text: String, link: String },
    List(Vec<CellValue>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn link(url: impl Into<String>) -> Self {
        let url = url.into();
        CellValue::Link {
            text: url.clone(),
            link: url,
        }
    }
}

/// Separator used when a list is flattened into a text column.
pub const LIST_SEPARATOR: &str = " / ";

/// Convert a source value into the cell value for `template`'s column.
///
/// `None` and blank strings become [`CellValue::Null`].
pub fn to_cell(
    value: Option<&FieldValue>,
    template: &FieldTemplate,
    category: ContentCategory,
) -> Result<CellValue, ConversionError> {
    let Some(value) = value else {
        return Ok(CellValue::Null);
    };
    if let FieldValue::Text(s) = value
        && s.trim().is_empty()
    {
        return Ok(CellValue::Null);
    }

    let key = template.key;
    match template.kind {
        FieldKind::Text => Ok(to_text(value)),
        FieldKind::Number => to_number(value, template),
        FieldKind::SingleSelect => to_select(value, key, category),
        FieldKind::DateTime => to_timestamp(value, key),
        FieldKind::Url => to_link(value, key),
    }
}

fn to_text(value: &FieldValue) -> CellValue {
    match value {
        FieldValue::Text(s) => CellValue::Text(s.clone()),
        FieldValue::Number(n) => CellValue::Text(n.to_string()),
        FieldValue::Boolean(b) => CellValue::Text(b.to_string()),
        FieldValue::Date(d) => CellValue::Text(d.format("%Y-%m-%d").to_string()),
        FieldValue::List(items) => {
            let parts: Vec<&str> = items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            if parts.is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(parts.join(LIST_SEPARATOR))
            }
        }
    }
}

fn to_number(value: &FieldValue, template: &FieldTemplate) -> Result<CellValue, ConversionError> {
    let key = template.key;
    let n = match value {
        FieldValue::Number(n) => *n,
        FieldValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        FieldValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionError::new(key.as_str(), format!("'{s}' is not a number")))?,
        FieldValue::Date(_) | FieldValue::List(_) => {
            return Err(ConversionError::new(
                key.as_str(),
                "expected a number",
            ));
        }
    };

    if !n.is_finite() {
        return Err(ConversionError::new(key.as_str(), "number is not finite"));
    }
    let below = template.property.min.is_some_and(|min| n < min);
    let above = template.property.max.is_some_and(|max| n > max);
    if below || above {
        return Err(ConversionError::new(
            key.as_str(),
            format!("{n} is outside the column range"),
        ));
    }
    Ok(CellValue::Number(n))
}

fn to_select(
    value: &FieldValue,
    key: FieldKey,
    category: ContentCategory,
) -> Result<CellValue, ConversionError> {
    let raw = match value {
        FieldValue::Text(s) => s.trim().to_string(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Date(_) | FieldValue::List(_) => {
            return Err(ConversionError::new(key.as_str(), "expected a single option"));
        }
    };

    if key == FieldKey::MyStatus {
        return category
            .status_option(&raw)
            .map(|opt| CellValue::Text(opt.name.to_string()))
            .ok_or_else(|| {
                ConversionError::new(
                    key.as_str(),
                    format!("'{raw}' is not a {category} status"),
                )
            });
    }
    Ok(CellValue::Text(raw))
}

fn to_timestamp(value: &FieldValue, key: FieldKey) -> Result<CellValue, ConversionError> {
    match value {
        FieldValue::Date(d) => Ok(CellValue::Timestamp(d.timestamp_millis())),
        FieldValue::Number(n) => Ok(CellValue::Timestamp(*n as i64)),
        FieldValue::Text(s) => parse_datetime(s)
            .map(|d| CellValue::Timestamp(d.timestamp_millis()))
            .ok_or_else(|| ConversionError::new(key.as_str(), format!("'{s}' is not a date"))),
        FieldValue::Boolean(_) | FieldValue::List(_) => {
            Err(ConversionError::new(key.as_str(), "expected a date"))
        }
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (midnight UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(d.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

fn to_link(value: &FieldValue, key: FieldKey) -> Result<CellValue, ConversionError> {
    match value {
        FieldValue::Text(s) => {
            let url = s.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(CellValue::link(url))
            } else {
                Err(ConversionError::new(key.as_str(), format!("'{url}' is not a URL")))
            }
        }
        _ => Err(ConversionError::new(key.as_str(), "expected a URL")),
    }
}
