//! Durable storage seam for field bindings

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::binding::{FieldBinding, TableRef};
use crate::error::Result;

/// Durable record of field bindings, keyed per (user, destination table).
pub trait BindingBackend: Send + Sync {
    fn load(&self, user: &str, table: &TableRef) -> Result<Option<FieldBinding>>;

    /// Overwrite unconditionally.
    fn save(&self, user: &str, table: &TableRef, binding: &FieldBinding) -> Result<()>;

    /// Returns whether a binding existed.
    fn remove(&self, user: &str, table: &TableRef) -> Result<bool>;
}

/// In-process backend, used in tests and for ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    bindings: Mutex<HashMap<(String, TableRef), FieldBinding>>,
    loads: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `load` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl BindingBackend for MemoryBackend {
    fn load(&self, user: &str, table: &TableRef) -> Result<Option<FieldBinding>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        Ok(bindings.get(&(user.to_string(), table.clone())).cloned())
    }

    fn save(&self, user: &str, table: &TableRef, binding: &FieldBinding) -> Result<()> {
        let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        bindings.insert((user.to_string(), table.clone()), binding.clone());
        Ok(())
    }

    fn remove(&self, user: &str, table: &TableRef) -> Result<bool> {
        let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        Ok(bindings.remove(&(user.to_string(), table.clone())).is_some())
    }
}
