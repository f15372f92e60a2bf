//! Field reconciliation and incremental sync for shelf-sync
//!
//! # Architecture
//!
//! ```text
//! SyncEngine
//!   -> BindingStore (shelf-store), bootstrapped through FieldReconciler
//!   -> Destination: paginated index by subject id
//!   -> classify: create / update / unchanged / delete-candidate by content hash
//!   -> batched inserts and updates, single deletes
//!   -> ProgressSink
//! ```
//!
//! The destination, content source and progress channel are collaborators
//! supplied by the caller through the traits in [`destination`], [`source`]
//! and [`progress`].

pub mod config;
pub mod destination;
pub mod error;
pub mod logging;
pub mod pacing;
pub mod progress;
pub mod reconcile;
pub mod source;
pub mod sync;

pub use config::{
    ConflictStrategy, FieldStrategy, MAX_CACHE_TTL_SECS, MatcherKind, ReconcileSettings,
    SyncSettings,
};
pub use destination::{
    Cells, Column, ColumnSpec, Credentials, Destination, DestinationError, DestinationRecord,
    DestinationResult, ErrorKind, PageRequest, RecordPage, RecordUpdate,
};
pub use error::{Error, Result};
pub use progress::{CompletionEvent, NoopProgress, NotifyError, ProgressSink, ProgressUpdate};
pub use reconcile::{
    BatchOutcome, BatchSummary, EnsureOptions, EnsureOutcome, ExactNameMatcher, FieldFailure,
    FieldMatcher, FieldOperation, FieldReconciler, ScoredMatcher,
};
pub use source::{ContentSource, SourceError};
pub use sync::{
    CategoryOutcome, CategoryResult, MultiSyncReport, RunRegistry, RunSummary, SyncEngine,
    SyncOptions, SyncPhase, SyncRequest, SyncRun,
};

// Re-exported so collaborators need only this crate.
pub use shelf_schema::{
    CellValue, ContentCategory, ContentRecord, FieldKey, FieldKind, FieldProperty, FieldTemplate,
    FieldValue, TemplateRegistry,
};
pub use shelf_store::{BindingStore, FieldBinding, TableRef};
