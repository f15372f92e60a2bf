//! Incremental synchronization of content records into a destination table

pub mod classify;
pub mod engine;
pub mod hash;
pub mod index;
pub mod payload;
pub mod run;

pub use classify::{Classification, DeleteCandidate, PlannedUpdate, classify};
pub use engine::{
    CategoryOutcome, CategoryResult, MultiSyncReport, SyncEngine, SyncOptions, SyncRequest,
};
pub use hash::{content_hash, normalize};
pub use index::DestinationIndex;
pub use payload::{MappedValues, cleared_keys, content_values, destination_values, row_cells};
pub use run::{DEFAULT_RUN_HISTORY, FailedItem, RunRegistry, RunSummary, SyncPhase, SyncRun};
