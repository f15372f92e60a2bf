//! Field binding persistence for shelf-sync
//!
//! Stores the resolved mapping from abstract field keys to destination
//! column ids, one binding per (user, destination table), behind a
//! short-lived cache with an injected clock.

pub mod backend;
pub mod binding;
pub mod cache;
pub mod clock;
pub mod error;
pub mod file;
pub mod io;
pub mod store;

pub use backend::{BindingBackend, MemoryBackend};
pub use binding::{FieldBinding, REQUIRED_FIELDS, SCHEMA_VERSION, TableRef, is_valid_column_id};
pub use cache::TtlCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use file::FileBackend;
pub use store::BindingStore;
