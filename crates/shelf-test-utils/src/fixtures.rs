//! Ready-made inputs for engine tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use shelf_core::{Credentials, SyncSettings};
use shelf_schema::{ContentCategory, ContentRecord, FieldKey};
use shelf_store::{BindingStore, FieldBinding, ManualClock, MemoryBackend, TableRef};

pub const USER: &str = "alice";

pub fn credentials() -> Credentials {
    Credentials::new("cli_test", "secret")
}

pub fn books_table() -> TableRef {
    TableRef::new("bascnShelf", "tblBooks")
}

/// Default settings with every courtesy delay disabled.
pub fn fast_settings() -> SyncSettings {
    SyncSettings::default().without_delays()
}

/// Fixed starting instant for [`ManualClock`]s.
pub fn epoch() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Binding store over a memory backend and a manual clock.
pub fn memory_store() -> (Arc<BindingStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(epoch()));
    let store = BindingStore::new(
        Arc::new(MemoryBackend::new()),
        fast_settings().cache_ttl(),
        clock.clone(),
    );
    (Arc::new(store), clock)
}

/// Binding for `category` from `(key, column id)` pairs.
pub fn binding(category: ContentCategory, fields: &[(FieldKey, &str)]) -> FieldBinding {
    let fields: BTreeMap<_, _> = fields.iter().map(|(k, v)| (*k, v.to_string())).collect();
    FieldBinding::new(category, fields, epoch())
}

pub fn book(subject_id: &str, title: &str) -> ContentRecord {
    ContentRecord::new(subject_id, ContentCategory::Book).with(FieldKey::Title, title)
}
