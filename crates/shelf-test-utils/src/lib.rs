//! Shared test fakes for the shelf-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`destination`]: [`InMemoryDestination`] with a call log and failure injection
//! - [`source`]: [`StaticSource`] serving fixed content records
//! - [`progress`]: [`RecordingProgress`] capturing progress and completion events
//! - [`fixtures`]: credentials, tables, stores and records for engine tests

pub mod destination;
pub mod fixtures;
pub mod progress;
pub mod source;

pub use destination::{Call, InMemoryDestination};
pub use progress::RecordingProgress;
pub use source::StaticSource;
