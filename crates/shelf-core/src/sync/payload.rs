//! Mapping between content records, field keys and destination cells

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shelf_schema::{CellValue, ContentRecord, ConversionError, FieldKey, TemplateRegistry, to_cell};
use shelf_store::FieldBinding;

use super::hash::normalize;
use crate::destination::{Cells, DestinationRecord};

/// Converted values for every bound content key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedValues {
    pub values: BTreeMap<FieldKey, CellValue>,
    /// Fields omitted because their value could not be converted
    pub errors: Vec<ConversionError>,
}

/// Convert a content record's values for every bound, non-metadata key.
///
/// Missing values and conversion failures map to null so that both sides
/// of a hash comparison cover the same keys.
pub fn content_values(
    record: &ContentRecord,
    binding: &FieldBinding,
    registry: &TemplateRegistry,
) -> MappedValues {
    let mut mapped = MappedValues::default();
    for key in binding.fields.keys().copied().filter(|k| !k.is_metadata()) {
        let Some(template) = registry.template_for(record.category, key) else {
            continue;
        };
        let value = record.value(key);
        let cell = match to_cell(value.as_ref(), template, record.category) {
            Ok(cell) => cell,
            Err(e) => {
                mapped.errors.push(e);
                CellValue::Null
            }
        };
        mapped.values.insert(key, cell);
    }
    mapped
}

/// Reverse-map a destination row onto the keys of `binding`.
pub fn destination_values(
    record: &DestinationRecord,
    binding: &FieldBinding,
    registry: &TemplateRegistry,
) -> BTreeMap<FieldKey, CellValue> {
    binding
        .fields
        .iter()
        .filter(|(key, _)| !key.is_metadata() && registry.is_supported(**key, binding.category))
        .map(|(key, column)| {
            let cell = record.cells.get(column).cloned().unwrap_or(CellValue::Null);
            (*key, cell)
        })
        .collect()
}

/// Keys that are null in `content` but still hold a value in `destination`.
pub fn cleared_keys(
    content: &BTreeMap<FieldKey, CellValue>,
    destination: &BTreeMap<FieldKey, CellValue>,
) -> Vec<FieldKey> {
    content
        .iter()
        .filter(|(key, value)| !key.is_identity() && is_blank(value))
        .filter(|(key, _)| destination.get(*key).is_some_and(|v| !is_blank(v)))
        .map(|(key, _)| *key)
        .collect()
}

fn is_blank(value: &CellValue) -> bool {
    normalize(value) == normalize(&CellValue::Null)
}

/// Row payload keyed by column id.
///
/// Null values are omitted, except for `cleared` keys which are written as
/// explicit nulls. The identity column is written on create only.
pub fn row_cells(
    values: &BTreeMap<FieldKey, CellValue>,
    binding: &FieldBinding,
    include_identity: bool,
    cleared: &[FieldKey],
    synced_at: Option<DateTime<Utc>>,
) -> Cells {
    let mut cells: Cells = values
        .iter()
        .filter(|(key, value)| !value.is_null() && (include_identity || !key.is_identity()))
        .filter_map(|(key, value)| {
            binding
                .column_for(*key)
                .map(|column| (column.to_string(), value.clone()))
        })
        .collect();

    for key in cleared.iter().filter(|k| include_identity || !k.is_identity()) {
        if let Some(column) = binding.column_for(*key) {
            cells.insert(column.to_string(), CellValue::Null);
        }
    }

    if let Some(at) = synced_at
        && let Some(column) = binding.column_for(FieldKey::SyncedAt)
    {
        cells.insert(column.to_string(), CellValue::Timestamp(at.timestamp_millis()));
    }
    cells
}
