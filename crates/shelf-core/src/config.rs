//! Sync settings parsed from a TOML file
//!
//! Every key is optional; an empty file yields the defaults.
//!
//! ```toml
//! page_size = 100
//! insert_batch_size = 100
//! batch_delay_ms = 300
//! conflict = "source-wins"
//!
//! [reconcile]
//! strategy = "ensure-correct"
//! matcher = "exact"
//! max_templates_per_batch = 20
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_page_size() -> usize {
    100
}

fn default_batch_size() -> usize {
    100
}

fn default_page_delay_ms() -> u64 {
    200
}

fn default_batch_delay_ms() -> u64 {
    300
}

fn default_delete_delay_ms() -> u64 {
    200
}

fn default_field_delay_ms() -> u64 {
    300
}

fn default_max_templates() -> usize {
    20
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Upper bound for `cache_ttl_secs`: one week.
pub const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

fn default_run_history() -> usize {
    crate::sync::run::DEFAULT_RUN_HISTORY
}

fn default_scored_threshold() -> f64 {
    0.7
}

/// How existing columns are located for a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatcherKind {
    /// Case-sensitive logical-name equality
    #[default]
    Exact,
    /// Legacy confidence-scored heuristics
    Scored,
}

/// What to do with a template whose column already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldStrategy {
    /// Issue a corrective update for differing properties
    #[default]
    EnsureCorrect,
    SkipExisting,
}

/// Resolution of values that differ between content and destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    #[default]
    SourceWins,
    DestinationWins,
    Merge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub strategy: FieldStrategy,
    pub matcher: MatcherKind,
    /// Fail-fast cap on templates per batch call
    pub max_templates_per_batch: usize,
    /// Pause between consecutive column mutations
    pub field_delay_ms: u64,
    /// Minimum confidence accepted by the scored matcher
    pub scored_threshold: f64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            strategy: FieldStrategy::default(),
            matcher: MatcherKind::default(),
            max_templates_per_batch: default_max_templates(),
            field_delay_ms: default_field_delay_ms(),
            scored_threshold: default_scored_threshold(),
        }
    }
}

impl ReconcileSettings {
    pub fn field_delay(&self) -> Duration {
        Duration::from_millis(self.field_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Destination records requested per page while indexing
    pub page_size: usize,
    pub page_delay_ms: u64,
    pub insert_batch_size: usize,
    pub update_batch_size: usize,
    /// Pause between consecutive insert or update batches
    pub batch_delay_ms: u64,
    /// Pause between consecutive single-record deletes
    pub delete_delay_ms: u64,
    /// Field binding cache expiry, at most [`MAX_CACHE_TTL_SECS`]
    pub cache_ttl_secs: u64,
    /// Finished runs kept per user and table for status queries
    pub run_history: usize,
    /// Default cap on content records fetched per category
    pub fetch_limit: Option<usize>,
    /// Default for runs that do not say whether to delete
    pub delete_missing: bool,
    /// Write the sync time into the `synced_at` column when it is bound
    pub stamp_synced_at: bool,
    pub conflict: ConflictStrategy,
    pub reconcile: ReconcileSettings,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            insert_batch_size: default_batch_size(),
            update_batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            delete_delay_ms: default_delete_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            run_history: default_run_history(),
            fetch_limit: None,
            delete_missing: false,
            stamp_synced_at: false,
            conflict: ConflictStrategy::default(),
            reconcile: ReconcileSettings::default(),
        }
    }
}

impl SyncSettings {
    /// Parse and validate settings from TOML content.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: SyncSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject settings the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.conflict != ConflictStrategy::SourceWins {
            return Err(Error::invalid_config(format!(
                "conflict strategy {:?} is not supported; only source-wins is implemented",
                self.conflict
            )));
        }
        for (name, value) in [
            ("page_size", self.page_size),
            ("insert_batch_size", self.insert_batch_size),
            ("update_batch_size", self.update_batch_size),
            ("reconcile.max_templates_per_batch", self.reconcile.max_templates_per_batch),
            ("run_history", self.run_history),
        ] {
            if value == 0 {
                return Err(Error::invalid_config(format!("{name} must be at least 1")));
            }
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(Error::invalid_config(format!(
                "cache_ttl_secs must be at most {MAX_CACHE_TTL_SECS}"
            )));
        }
        if !(0.0..=1.0).contains(&self.reconcile.scored_threshold) {
            return Err(Error::invalid_config(
                "reconcile.scored_threshold must be between 0 and 1",
            ));
        }
        Ok(())
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn delete_delay(&self) -> Duration {
        Duration::from_millis(self.delete_delay_ms)
    }

    /// Cache TTL, clamped to [`MAX_CACHE_TTL_SECS`] for unvalidated settings.
    pub fn cache_ttl(&self) -> chrono::TimeDelta {
        let secs = self.cache_ttl_secs.min(MAX_CACHE_TTL_SECS);
        i64::try_from(secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }

    /// Settings with every pause disabled.
    pub fn without_delays(mut self) -> Self {
        self.page_delay_ms = 0;
        self.batch_delay_ms = 0;
        self.delete_delay_ms = 0;
        self.reconcile.field_delay_ms = 0;
        self
    }
}
