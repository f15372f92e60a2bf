//! SyncEngine runs against the in-memory fakes

use std::sync::Arc;

use pretty_assertions::assert_eq;
use shelf_core::{
    BindingStore, CategoryResult, CellValue, ContentCategory, Error, FieldKey,
    RecordUpdate, SyncEngine, SyncOptions, SyncPhase, SyncRequest, SyncSettings,
};
use shelf_store::{Clock, FileBackend, ManualClock, TableRef};
use tempfile::TempDir;
use shelf_test_utils::fixtures::{USER, binding, book, books_table, credentials, fast_settings, memory_store};
use shelf_test_utils::{Call, InMemoryDestination, RecordingProgress, StaticSource};

struct Harness {
    destination: Arc<InMemoryDestination>,
    source: Arc<StaticSource>,
    store: Arc<BindingStore>,
    clock: Arc<ManualClock>,
    progress: Arc<RecordingProgress>,
    engine: SyncEngine,
}

fn harness(settings: SyncSettings) -> Harness {
    let destination = Arc::new(InMemoryDestination::new());
    let source = Arc::new(StaticSource::new());
    let (store, clock) = memory_store();
    let progress = Arc::new(RecordingProgress::new());
    let engine = SyncEngine::new(destination.clone(), source.clone(), store.clone(), settings)
        .with_progress(progress.clone());
    Harness {
        destination,
        source,
        store,
        clock,
        progress,
        engine,
    }
}

fn request(options: SyncOptions) -> SyncRequest {
    SyncRequest::new(USER, credentials(), books_table(), ContentCategory::Book).with_options(options)
}

/// Store a binding for subject id, title and rating.
fn bind_title(h: &Harness) {
    h.store
        .set(
            USER,
            &books_table(),
            binding(
                ContentCategory::Book,
                &[
                    (FieldKey::SubjectId, "fldSubject"),
                    (FieldKey::Title, "fldTitle"),
                    (FieldKey::MyRating, "fldRating"),
                ],
            ),
        )
        .unwrap();
}

fn seed(h: &Harness, subject: &str, title: &str) -> String {
    h.destination.seed_record(
        [
            ("fldSubject".to_string(), CellValue::text(subject)),
            ("fldTitle".to_string(), CellValue::text(title)),
        ]
        .into_iter()
        .collect(),
    )
}

fn count(calls: &[Call], pred: impl Fn(&Call) -> bool) -> usize {
    calls.iter().filter(|c| pred(c)).count()
}

#[tokio::test]
async fn new_record_is_created_then_unchanged() {
    let h = harness(fast_settings());
    h.source.set_records(
        ContentCategory::Book,
        vec![book("B1", "X").with(FieldKey::MyRating, 5.0)],
    );

    let first = h.engine.sync(&request(SyncOptions::default())).await.unwrap();
    assert_eq!(first.summary.created, 1);
    assert!(first.success());
    assert!(h.store.get(USER, &books_table()).unwrap().is_some());

    h.destination.clear_calls();
    let second = h.engine.sync(&request(SyncOptions::default())).await.unwrap();

    assert_eq!(second.summary.unchanged, 1);
    assert_eq!(second.summary.created, 0);
    assert_eq!(second.summary.updated, 0);
    // Binding is reused; no column work on the second run
    assert_eq!(h.destination.mutation_count(), 0);
}

#[tokio::test]
async fn changed_title_updates_only_the_title_column() {
    let h = harness(fast_settings());
    bind_title(&h);
    let record_id = seed(&h, "B1", "X");
    h.source
        .set_records(ContentCategory::Book, vec![book("B1", "Y")]);

    let run = h.engine.sync(&request(SyncOptions::default())).await.unwrap();

    assert_eq!(run.summary.updated, 1);
    let updates: Vec<_> = h
        .destination
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::UpdateRecords { updates } => Some(updates),
            _ => None,
        })
        .collect();
    assert_eq!(
        updates,
        vec![vec![RecordUpdate {
            record_id: record_id.clone(),
            cells: [("fldTitle".to_string(), CellValue::text("Y"))].into_iter().collect(),
        }]]
    );
    let stored = h.destination.record(&record_id).unwrap();
    assert_eq!(stored.cells["fldTitle"], CellValue::text("Y"));
}

#[tokio::test]
async fn delete_candidates_are_left_alone_unless_enabled() {
    let h = harness(fast_settings());
    bind_title(&h);
    seed(&h, "B1", "Kept");
    let gone = seed(&h, "B2", "Gone");
    h.source
        .set_records(ContentCategory::Book, vec![book("B1", "Kept")]);

    let run = h.engine.sync(&request(SyncOptions::default())).await.unwrap();
    assert_eq!(run.summary.delete_candidates, 1);
    assert_eq!(run.summary.deleted, 0);
    assert_eq!(count(&h.destination.calls(), |c| matches!(c, Call::DeleteRecord { .. })), 0);

    let options = SyncOptions {
        delete_missing: true,
        ..SyncOptions::default()
    };
    let run = h.engine.sync(&request(options)).await.unwrap();
    assert_eq!(run.summary.deleted, 1);
    let deletes: Vec<_> = h
        .destination
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::DeleteRecord { .. }))
        .collect();
    assert_eq!(deletes, vec![Call::DeleteRecord { record_id: gone }]);
}

#[tokio::test]
async fn classification_partitions_records_with_subject_ids() {
    let h = harness(fast_settings());
    bind_title(&h);
    seed(&h, "B1", "Same");
    seed(&h, "B2", "Old");
    h.source.set_records(
        ContentCategory::Book,
        vec![
            book("B1", "Same"),
            book("B2", "New"),
            book("B3", "Fresh"),
            book("  ", "No id"),
            book("B4", "Fresh too"),
        ],
    );

    let run = h.engine.sync(&request(SyncOptions::default())).await.unwrap();

    let s = run.summary;
    assert_eq!(s.created + s.updated + s.unchanged, 4);
    assert_eq!((s.created, s.updated, s.unchanged, s.skipped), (2, 1, 1, 1));
    assert!(run.success());
    assert_eq!(run.warnings.len(), 1);
}

#[tokio::test]
async fn failed_batch_is_isolated() {
    let settings = SyncSettings {
        insert_batch_size: 2,
        ..fast_settings()
    };
    let h = harness(settings);
    bind_title(&h);
    h.destination.fail_subject("B3");
    h.source.set_records(
        ContentCategory::Book,
        (1..=4).map(|i| book(&format!("B{i}"), "T")).collect(),
    );

    let run = h.engine.sync(&request(SyncOptions::default())).await.unwrap();

    assert_eq!(run.summary.created, 2);
    assert_eq!(run.summary.failed, 2);
    assert_eq!(run.phase, SyncPhase::Done);
    assert!(!run.success());
    let failed: Vec<_> = run.failures.iter().map(|f| f.subject_id.as_str()).collect();
    assert_eq!(failed, vec!["B3", "B4"]);
    assert_eq!(run.failures[0].phase, SyncPhase::Creating);
}

#[tokio::test]
async fn failed_delete_is_isolated() {
    let h = harness(fast_settings());
    bind_title(&h);
    let locked = seed(&h, "B8", "Locked");
    seed(&h, "B9", "Free");
    h.destination.fail_delete(&locked);

    let options = SyncOptions {
        delete_missing: true,
        ..SyncOptions::default()
    };
    let run = h.engine.sync(&request(options)).await.unwrap();

    assert_eq!(run.summary.deleted, 1);
    assert_eq!(run.summary.failed, 1);
    assert_eq!(h.destination.records().len(), 1);
}

#[tokio::test]
async fn full_sync_rewrites_unchanged_records() {
    let h = harness(fast_settings());
    bind_title(&h);
    seed(&h, "B1", "Same");
    h.source
        .set_records(ContentCategory::Book, vec![book("B1", "Same")]);

    let options = SyncOptions {
        full_sync: true,
        ..SyncOptions::default()
    };
    let run = h.engine.sync(&request(options)).await.unwrap();

    assert_eq!(run.summary.updated, 1);
    assert_eq!(run.summary.unchanged, 0);
}

#[tokio::test]
async fn destination_is_indexed_page_by_page() {
    let settings = SyncSettings {
        page_size: 2,
        ..fast_settings()
    };
    let h = harness(settings);
    bind_title(&h);
    for i in 1..=5 {
        seed(&h, &format!("B{i}"), "T");
    }
    h.source.set_records(
        ContentCategory::Book,
        (1..=5).map(|i| book(&format!("B{i}"), "T")).collect(),
    );

    let run = h.engine.sync(&request(SyncOptions::default())).await.unwrap();

    assert_eq!(run.summary.unchanged, 5);
    let pages = count(&h.destination.calls(), |c| matches!(c, Call::ListRecords { .. }));
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn indexing_failure_fails_the_run_before_mutation() {
    let settings = SyncSettings {
        page_size: 1,
        ..fast_settings()
    };
    let h = harness(settings);
    bind_title(&h);
    seed(&h, "B1", "T");
    seed(&h, "B2", "T");
    h.destination.fail_listing_after(1);
    h.source
        .set_records(ContentCategory::Book, vec![book("B3", "New")]);

    let err = h.engine.sync(&request(SyncOptions::default())).await.unwrap_err();

    assert!(matches!(err, Error::Indexing { .. }), "{err}");
    assert_eq!(h.destination.mutation_count(), 0);
    let run = h.engine.latest_run(USER, &books_table()).unwrap();
    assert_eq!(run.phase, SyncPhase::Failed);
    assert!(run.error.is_some());
    assert!(!h.progress.completions()[0].success);
}

#[tokio::test]
async fn unresolved_subject_column_aborts_before_record_mutation() {
    let h = harness(fast_settings());
    h.destination.fail_column("Subject ID");
    h.source
        .set_records(ContentCategory::Book, vec![book("B1", "X")]);

    let err = h.engine.sync(&request(SyncOptions::default())).await.unwrap_err();

    assert!(matches!(err, Error::SubjectFieldUnresolved { .. }), "{err}");
    assert!(err.is_configuration());
    assert!(h.store.get(USER, &books_table()).unwrap().is_none());
    let calls = h.destination.calls();
    assert_eq!(count(&calls, |c| matches!(c, Call::InsertRecords { .. })), 0);
    assert_eq!(count(&calls, |c| matches!(c, Call::ListRecords { .. })), 0);
}

#[tokio::test]
async fn binding_for_another_category_is_rejected() {
    let h = harness(fast_settings());
    h.store
        .set(
            USER,
            &books_table(),
            binding(ContentCategory::Movie, &[(FieldKey::SubjectId, "fldSubject")]),
        )
        .unwrap();

    let err = h.engine.sync(&request(SyncOptions::default())).await.unwrap_err();

    assert!(matches!(err, Error::CategoryMismatch { .. }), "{err}");
    assert!(h.destination.calls().is_empty());
}

#[tokio::test]
async fn progress_follows_phase_order() {
    let h = harness(fast_settings());
    bind_title(&h);
    h.source
        .set_records(ContentCategory::Book, vec![book("B1", "X")]);

    let run = h.engine.sync(&request(SyncOptions::default())).await.unwrap();

    assert_eq!(
        h.progress.phases(),
        vec![
            SyncPhase::Initializing,
            SyncPhase::IndexingDestination,
            SyncPhase::Classifying,
            SyncPhase::Creating,
            SyncPhase::Updating,
            SyncPhase::Done,
        ]
    );
    let completions = h.progress.completions();
    assert_eq!(completions.len(), 1);
    assert!(completions[0].success);
    assert_eq!(completions[0].items_processed, 1);
    assert_eq!(h.engine.run_status(run.id).unwrap(), run);
}

#[tokio::test]
async fn failing_progress_sink_does_not_fail_the_run() {
    let destination = Arc::new(InMemoryDestination::new());
    let source = Arc::new(StaticSource::with_records(vec![book("B1", "X")]));
    let (store, _clock) = memory_store();
    let engine = SyncEngine::new(destination, source, store, fast_settings())
        .with_progress(Arc::new(RecordingProgress::failing()));

    let run = engine.sync(&request(SyncOptions::default())).await.unwrap();
    assert!(run.success());
}

#[tokio::test]
async fn synced_at_is_stamped_when_enabled() {
    let settings = SyncSettings {
        stamp_synced_at: true,
        ..fast_settings()
    };
    let h = harness(settings);
    h.store
        .set(
            USER,
            &books_table(),
            binding(
                ContentCategory::Book,
                &[(FieldKey::SubjectId, "fldSubject"), (FieldKey::SyncedAt, "fldSynced")],
            ),
        )
        .unwrap();
    h.source
        .set_records(ContentCategory::Book, vec![book("B1", "X")]);

    h.engine.sync(&request(SyncOptions::default())).await.unwrap();

    let record = &h.destination.records()[0];
    assert_eq!(
        record.cells["fldSynced"],
        CellValue::Timestamp(h.clock.now().timestamp_millis())
    );
}

#[tokio::test]
async fn fetch_limit_is_passed_to_the_source() {
    let h = harness(fast_settings());
    bind_title(&h);
    h.source.set_records(
        ContentCategory::Book,
        (1..=5).map(|i| book(&format!("B{i}"), "T")).collect(),
    );

    let options = SyncOptions {
        limit: Some(2),
        ..SyncOptions::default()
    };
    let run = h.engine.sync(&request(options)).await.unwrap();

    assert_eq!(run.summary.created, 2);
    assert_eq!(h.source.fetches()[0].2, Some(2));
}

#[tokio::test]
async fn source_failure_skips_only_that_category() {
    let h = harness(fast_settings());
    h.source
        .set_records(ContentCategory::Book, vec![book("B1", "X")]);
    h.source.fail_category(ContentCategory::Movie);
    let movies = TableRef::new("bascnShelf", "tblMovies");

    let requests = vec![
        SyncRequest::new(USER, credentials(), movies, ContentCategory::Movie),
        request(SyncOptions::default()),
    ];
    let report = h.engine.sync_all(&requests).await;

    assert_eq!(report.outcomes.len(), 2);
    assert!(matches!(report.outcomes[0].result, CategoryResult::Skipped { .. }));
    assert!(matches!(report.outcomes[1].result, CategoryResult::Completed { .. }));
    assert_eq!(report.skipped().count(), 1);
    assert_eq!(report.totals().created, 1);
    assert!(!report.success());
}

#[tokio::test]
async fn single_category_source_failure_is_fatal() {
    let h = harness(fast_settings());
    bind_title(&h);
    h.source.fail_category(ContentCategory::Book);

    let err = h.engine.sync(&request(SyncOptions::default())).await.unwrap_err();
    assert!(matches!(err, Error::Source(_)), "{err}");
}

#[tokio::test]
async fn bootstrapped_binding_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let destination = Arc::new(InMemoryDestination::new());
    let source = Arc::new(StaticSource::with_records(vec![book("B1", "X")]));
    let clock = Arc::new(ManualClock::new(shelf_test_utils::fixtures::epoch()));
    let file_store = || {
        Arc::new(BindingStore::new(
            Arc::new(FileBackend::new(dir.path())),
            fast_settings().cache_ttl(),
            clock.clone(),
        ))
    };

    let engine = SyncEngine::new(destination.clone(), source.clone(), file_store(), fast_settings());
    engine.sync(&request(SyncOptions::default())).await.unwrap();
    let columns = destination.columns().len();

    let restarted = SyncEngine::new(destination.clone(), source, file_store(), fast_settings());
    let run = restarted.sync(&request(SyncOptions::default())).await.unwrap();

    assert_eq!(run.summary.unchanged, 1);
    assert_eq!(destination.columns().len(), columns);
    assert!(dir.path().join("alice.json").exists());
}

#[tokio::test]
async fn removed_attribute_is_cleared_once_then_unchanged() {
    let h = harness(fast_settings());
    bind_title(&h);
    let record_id = h.destination.seed_record(
        [
            ("fldSubject".to_string(), CellValue::text("B1")),
            ("fldTitle".to_string(), CellValue::text("X")),
            ("fldRating".to_string(), CellValue::Number(4.0)),
        ]
        .into_iter()
        .collect(),
    );
    h.source
        .set_records(ContentCategory::Book, vec![book("B1", "X")]);

    let first = h.engine.sync(&request(SyncOptions::default())).await.unwrap();
    assert_eq!(first.summary.updated, 1);
    let cleared: Vec<_> = h
        .destination
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::UpdateRecords { updates } => Some(updates),
            _ => None,
        })
        .collect();
    assert_eq!(
        cleared,
        vec![vec![RecordUpdate {
            record_id: record_id.clone(),
            cells: [
                ("fldRating".to_string(), CellValue::Null),
                ("fldTitle".to_string(), CellValue::text("X")),
            ]
            .into_iter()
            .collect(),
        }]]
    );
    assert!(!h.destination.record(&record_id).unwrap().cells.contains_key("fldRating"));

    let second = h.engine.sync(&request(SyncOptions::default())).await.unwrap();
    assert_eq!(second.summary.updated, 0);
    assert_eq!(second.summary.unchanged, 1);
}

#[tokio::test]
async fn missing_insert_ids_count_as_failures() {
    let h = harness(fast_settings());
    bind_title(&h);
    h.destination.withhold_insert_ids(1);
    h.source.set_records(
        ContentCategory::Book,
        vec![book("B1", "One"), book("B2", "Two"), book("B3", "Three")],
    );

    let run = h.engine.sync(&request(SyncOptions::default())).await.unwrap();

    assert_eq!(run.summary.created, 2);
    assert_eq!(run.summary.failed, 1);
    assert_eq!(run.failures[0].subject_id, "B3");
    assert!(!run.success());
}
