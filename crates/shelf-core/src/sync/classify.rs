//! Change classification
//!
//! Pure function of the content records, the destination index and the
//! binding. Every content record with a subject id lands in exactly one of
//! create, update or unchanged.

use std::collections::HashSet;

use shelf_schema::{ContentRecord, FieldKey, TemplateRegistry};
use shelf_store::FieldBinding;

use super::hash::content_hash;
use super::index::DestinationIndex;
use super::payload::{cleared_keys, content_values, destination_values};

/// Content record paired with the destination row it updates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate<'a> {
    pub record_id: String,
    pub record: &'a ContentRecord,
    /// Keys the content no longer has but the destination row still holds
    pub cleared: Vec<FieldKey>,
}

/// Destination row with no matching content record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCandidate {
    pub subject_id: String,
    pub record_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification<'a> {
    pub create: Vec<&'a ContentRecord>,
    pub update: Vec<PlannedUpdate<'a>>,
    pub unchanged: Vec<&'a ContentRecord>,
    pub delete_candidates: Vec<DeleteCandidate>,
    /// Positions of content records skipped for lacking a subject id
    pub skipped: Vec<usize>,
}

impl Classification<'_> {
    /// Records that take part in the partition.
    pub fn classified(&self) -> usize {
        self.create.len() + self.update.len() + self.unchanged.len()
    }
}

/// Classify `records` against `index`.
///
/// With `full_sync` every indexed record is updated regardless of its hash.
pub fn classify<'a>(
    records: &'a [ContentRecord],
    index: &DestinationIndex,
    binding: &FieldBinding,
    registry: &TemplateRegistry,
    full_sync: bool,
) -> Classification<'a> {
    let mut out = Classification::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for (position, record) in records.iter().enumerate() {
        let Some(subject) = record.subject() else {
            out.skipped.push(position);
            continue;
        };
        seen.insert(subject);

        let Some(existing) = index.get(subject) else {
            out.create.push(record);
            continue;
        };

        let ours = content_values(record, binding, registry);
        let theirs = destination_values(existing, binding, registry);
        if full_sync || content_hash(&ours.values) != content_hash(&theirs) {
            out.update.push(PlannedUpdate {
                record_id: existing.record_id.clone(),
                record,
                cleared: cleared_keys(&ours.values, &theirs),
            });
        } else {
            out.unchanged.push(record);
        }
    }

    let mut candidates: Vec<DeleteCandidate> = index
        .iter()
        .filter(|(subject, _)| !seen.contains(subject))
        .map(|(subject, record)| DeleteCandidate {
            subject_id: subject.to_string(),
            record_id: record.record_id.clone(),
        })
        .collect();
    candidates.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
    out.delete_candidates = candidates;

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use shelf_schema::{CellValue, ContentCategory};

    use crate::destination::{Cells, DestinationRecord};

    fn binding() -> FieldBinding {
        let fields = [(FieldKey::SubjectId, "fldSubject"), (FieldKey::Title, "fldTitle")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        FieldBinding::new(ContentCategory::Book, fields, Utc::now())
    }

    fn row(record_id: &str, subject: &str, title: &str) -> DestinationRecord {
        let cells = Cells::from([
            ("fldSubject".to_string(), CellValue::text(subject)),
            ("fldTitle".to_string(), CellValue::text(title)),
        ]);
        DestinationRecord::new(record_id, cells)
    }

    fn book(subject: &str, title: &str) -> ContentRecord {
        ContentRecord::new(subject, ContentCategory::Book).with(FieldKey::Title, title)
    }

    #[test]
    fn records_are_partitioned() {
        let registry = TemplateRegistry::with_builtins();
        let index = DestinationIndex::build(
            vec![row("rec1", "B1", "Same"), row("rec2", "B2", "Old"), row("rec3", "B9", "Gone")],
            "fldSubject",
        );
        let records = vec![book("B1", "same "), book("B2", "New"), book("B3", "Fresh"), book("", "Nameless")];

        let c = classify(&records, &index, &binding(), &registry, false);

        assert_eq!(c.unchanged.len(), 1);
        assert_eq!(c.update, vec![PlannedUpdate { record_id: "rec2".into(), record: &records[1], cleared: vec![] }]);
        assert_eq!(c.create, vec![&records[2]]);
        assert_eq!(c.skipped, vec![3]);
        assert_eq!(c.classified(), 3);
        assert_eq!(
            c.delete_candidates,
            vec![DeleteCandidate { subject_id: "B9".into(), record_id: "rec3".into() }]
        );
    }

    #[test]
    fn full_sync_updates_unchanged_records() {
        let registry = TemplateRegistry::with_builtins();
        let index = DestinationIndex::build(vec![row("rec1", "B1", "Same")], "fldSubject");
        let records = vec![book("B1", "Same")];

        let c = classify(&records, &index, &binding(), &registry, true);
        assert_eq!(c.update.len(), 1);
        assert!(c.unchanged.is_empty());
    }

    #[test]
    fn removed_title_is_planned_as_a_clear() {
        let registry = TemplateRegistry::with_builtins();
        let index = DestinationIndex::build(vec![row("rec1", "B1", "Old")], "fldSubject");
        let records = vec![ContentRecord::new("B1", ContentCategory::Book)];

        let c = classify(&records, &index, &binding(), &registry, false);
        assert_eq!(c.update.len(), 1);
        assert_eq!(c.update[0].cleared, vec![FieldKey::Title]);
    }
}
