//! Destination records indexed by subject id

use std::collections::HashMap;

use shelf_schema::CellValue;
use tracing::warn;

use crate::destination::DestinationRecord;

#[derive(Debug, Clone, Default)]
pub struct DestinationIndex {
    by_subject: HashMap<String, DestinationRecord>,
    /// Records whose subject column was empty
    skipped: usize,
    /// Subject ids held by more than one record; the first record wins
    duplicates: Vec<String>,
}

impl DestinationIndex {
    /// Index `records` by the value of `subject_column`.
    pub fn build(
        records: impl IntoIterator<Item = DestinationRecord>,
        subject_column: &str,
    ) -> Self {
        let mut index = Self::default();
        for record in records {
            let Some(subject) = record.cells.get(subject_column).and_then(subject_text) else {
                index.skipped += 1;
                continue;
            };
            if index.by_subject.contains_key(&subject) {
                warn!(subject = %subject, record_id = %record.record_id, "duplicate subject id in destination");
                index.duplicates.push(subject);
                continue;
            }
            index.by_subject.insert(subject, record);
        }
        index
    }

    pub fn get(&self, subject_id: &str) -> Option<&DestinationRecord> {
        self.by_subject.get(subject_id)
    }

    pub fn contains(&self, subject_id: &str) -> bool {
        self.by_subject.contains_key(subject_id)
    }

    pub fn len(&self) -> usize {
        self.by_subject.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_subject.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DestinationRecord)> {
        self.by_subject.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Subject id held in a destination cell, if non-empty.
fn subject_text(cell: &CellValue) -> Option<String> {
    let text = match cell {
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Number(n) => n.to_string(),
        CellValue::List(items) => items.first().and_then(subject_text)?,
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Cells;

    fn record(id: &str, subject: CellValue) -> DestinationRecord {
        let mut cells = Cells::new();
        cells.insert("fldSubject".to_string(), subject);
        DestinationRecord::new(id, cells)
    }

    #[test]
    fn empty_subjects_are_skipped() {
        let index = DestinationIndex::build(
            vec![
                record("rec1", CellValue::text("B1")),
                record("rec2", CellValue::text("  ")),
                record("rec3", CellValue::Null),
                DestinationRecord::new("rec4", Cells::new()),
            ],
            "fldSubject",
        );

        assert_eq!(index.len(), 1);
        assert_eq!(index.skipped(), 3);
        assert_eq!(index.get("B1").unwrap().record_id, "rec1");
    }

    #[test]
    fn first_record_wins_for_duplicate_subjects() {
        let index = DestinationIndex::build(
            vec![
                record("rec1", CellValue::text("B1")),
                record("rec2", CellValue::text(" B1")),
            ],
            "fldSubject",
        );

        assert_eq!(index.get("B1").unwrap().record_id, "rec1");
        assert_eq!(index.duplicates(), ["B1".to_string()]);
    }

    #[test]
    fn numeric_subject_ids_are_indexed() {
        let index = DestinationIndex::build(vec![record("rec1", CellValue::Number(1024.0))], "fldSubject");
        assert!(index.contains("1024"));
    }
}
