//! Tests for the BindingStore and its backends

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use shelf_schema::{ContentCategory, FieldKey};
use shelf_store::{
    BindingBackend, BindingStore, Error, FieldBinding, FileBackend, ManualClock, MemoryBackend,
    TableRef,
};
use tempfile::TempDir;

fn books() -> TableRef {
    TableRef::new("bascnShelf", "tblBooks")
}

fn binding(fields: &[(FieldKey, &str)]) -> FieldBinding {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let fields: BTreeMap<_, _> = fields.iter().map(|(k, v)| (*k, v.to_string())).collect();
    FieldBinding::new(ContentCategory::Book, fields, now)
}

fn memory_store(ttl_secs: i64) -> (Arc<MemoryBackend>, Arc<ManualClock>, BindingStore) {
    let backend = Arc::new(MemoryBackend::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = BindingStore::new(backend.clone(), Duration::seconds(ttl_secs), clock.clone());
    (backend, clock, store)
}

#[test]
fn get_returns_none_when_nothing_stored() {
    let (_backend, _clock, store) = memory_store(60);
    assert!(store.get("alice", &books()).unwrap().is_none());
}

#[test]
fn set_then_get_is_served_from_cache() {
    let (backend, _clock, store) = memory_store(60);
    let b = binding(&[(FieldKey::SubjectId, "fldSubject"), (FieldKey::Title, "fldTitle")]);

    store.set("alice", &books(), b.clone()).unwrap();
    let loads_before = backend.load_count();

    assert_eq!(store.get("alice", &books()).unwrap(), Some(b));
    assert_eq!(backend.load_count(), loads_before);
}

#[test]
fn expired_cache_entry_falls_through_to_backend() {
    let (backend, clock, store) = memory_store(60);
    let b = binding(&[(FieldKey::SubjectId, "fldSubject")]);
    store.set("alice", &books(), b.clone()).unwrap();

    clock.advance(Duration::seconds(61));

    // Expiry must not be mistaken for "no binding".
    assert_eq!(store.get("alice", &books()).unwrap(), Some(b));
    assert_eq!(backend.load_count(), 1);
}

#[test]
fn invalid_binding_is_rejected_before_persistence() {
    let (backend, _clock, store) = memory_store(60);
    let b = binding(&[(FieldKey::Title, "fldTitle")]);

    let err = store.set("alice", &books(), b).unwrap_err();
    assert!(matches!(err, Error::InvalidBinding { .. }));
    assert!(backend.load("alice", &books()).unwrap().is_none());
}

#[test]
fn clear_removes_cached_and_durable_copies() {
    let (_backend, _clock, store) = memory_store(60);
    store
        .set("alice", &books(), binding(&[(FieldKey::SubjectId, "fldSubject")]))
        .unwrap();

    assert!(store.clear("alice", &books()).unwrap());
    assert!(store.get("alice", &books()).unwrap().is_none());
    assert!(!store.clear("alice", &books()).unwrap());
}

#[test]
fn bindings_are_scoped_per_user_and_table() {
    let (_backend, _clock, store) = memory_store(60);
    let movies = TableRef::new("bascnShelf", "tblMovies");
    store
        .set("alice", &books(), binding(&[(FieldKey::SubjectId, "fldAliceBk")]))
        .unwrap();

    assert!(store.get("bob", &books()).unwrap().is_none());
    assert!(store.get("alice", &movies).unwrap().is_none());
}

#[test]
fn file_backend_round_trips_bindings() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path());
    let b = binding(&[(FieldKey::SubjectId, "fldSubject"), (FieldKey::MyRating, "fldRating")]);

    backend.save("alice", &books(), &b).unwrap();
    assert_eq!(backend.load("alice", &books()).unwrap(), Some(b));
}

#[test]
fn file_backend_uses_persisted_layout() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path());
    backend
        .save("alice", &books(), &binding(&[(FieldKey::SubjectId, "fldSubject")]))
        .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("alice.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &json["destinations"]["bascnShelf:tblBooks"];
    assert_eq!(entry["fieldBindings"]["subject_id"], "fldSubject");
    assert_eq!(entry["contentCategory"], "book");
    assert_eq!(entry["schemaVersion"], 1);
}

#[test]
fn file_backend_keeps_other_tables_on_write() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path());
    let movies = TableRef::new("bascnShelf", "tblMovies");

    backend
        .save("alice", &books(), &binding(&[(FieldKey::SubjectId, "fldBooks01")]))
        .unwrap();
    backend
        .save("alice", &movies, &binding(&[(FieldKey::SubjectId, "fldMovies1")]))
        .unwrap();
    assert!(backend.remove("alice", &books()).unwrap());

    assert!(backend.load("alice", &books()).unwrap().is_none());
    assert!(backend.load("alice", &movies).unwrap().is_some());
}

#[rstest]
#[case("alice@x.com", "alice_x_com")]
#[case("a.b", "a_b")]
#[case("Alice", "alice")]
fn file_backend_isolates_similar_user_ids(#[case] owner: &str, #[case] other: &str) {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::new(dir.path());
    let b = binding(&[(FieldKey::SubjectId, "fldSubject")]);

    backend.save(owner, &books(), &b).unwrap();

    assert!(backend.load(other, &books()).unwrap().is_none());
    assert!(!backend.remove(other, &books()).unwrap());
    assert_eq!(backend.load(owner, &books()).unwrap(), Some(b));
}

#[rstest]
#[case("not json")]
#[case("{\"destinations\": 3}")]
fn file_backend_reports_corrupt_documents(#[case] content: &str) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("alice.json"), content).unwrap();
    let backend = FileBackend::new(dir.path());

    let err = backend.load("alice", &books()).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }), "{err}");
}
