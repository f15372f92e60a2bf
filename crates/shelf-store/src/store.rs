//! Field Binding Store: durable backend behind a TTL cache

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use crate::backend::BindingBackend;
use crate::binding::{FieldBinding, TableRef};
use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::error::Result;

type CacheKey = (String, TableRef);

/// Resolved field bindings per (user, destination table).
///
/// Reads may be stale by up to the cache TTL; writes overwrite
/// unconditionally. A cache miss always falls through to the backend.
pub struct BindingStore {
    backend: Arc<dyn BindingBackend>,
    cache: TtlCache<CacheKey, FieldBinding>,
    clock: Arc<dyn Clock>,
}

impl BindingStore {
    pub fn new(backend: Arc<dyn BindingBackend>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            cache: TtlCache::new(ttl, clock.clone()),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn get(&self, user: &str, table: &TableRef) -> Result<Option<FieldBinding>> {
        let key = (user.to_string(), table.clone());
        if let Some(binding) = self.cache.get(&key) {
            debug!(user, table = %table, "field binding served from cache");
            return Ok(Some(binding));
        }

        let loaded = self.backend.load(user, table)?;
        if let Some(binding) = &loaded {
            self.cache.put(key, binding.clone());
        }
        Ok(loaded)
    }

    /// Validate, persist, then cache.
    pub fn set(&self, user: &str, table: &TableRef, binding: FieldBinding) -> Result<()> {
        binding.validate()?;
        self.backend.save(user, table, &binding)?;
        info!(
            user,
            table = %table,
            fields = binding.fields.len(),
            "field binding stored"
        );
        self.cache.put((user.to_string(), table.clone()), binding);
        Ok(())
    }

    /// Remove the durable record and the cached copy.
    pub fn clear(&self, user: &str, table: &TableRef) -> Result<bool> {
        self.cache.invalidate(&(user.to_string(), table.clone()));
        let existed = self.backend.remove(user, table)?;
        info!(user, table = %table, existed, "field binding cleared");
        Ok(existed)
    }

    /// Drop the cached copy only; the next `get` reloads from the backend.
    pub fn invalidate(&self, user: &str, table: &TableRef) {
        self.cache.invalidate(&(user.to_string(), table.clone()));
    }
}
