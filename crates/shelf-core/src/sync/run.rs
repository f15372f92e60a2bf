//! Sync run state and the registry that retains it

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shelf_schema::ContentCategory;
use shelf_store::TableRef;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Initializing,
    BootstrappingBindings,
    IndexingDestination,
    Classifying,
    Creating,
    Updating,
    Deleting,
    Done,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Initializing => "initializing",
            SyncPhase::BootstrappingBindings => "bootstrapping_bindings",
            SyncPhase::IndexingDestination => "indexing_destination",
            SyncPhase::Classifying => "classifying",
            SyncPhase::Creating => "creating",
            SyncPhase::Updating => "updating",
            SyncPhase::Deleting => "deleting",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Done | SyncPhase::Failed)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
    pub unchanged: usize,
    /// Content records without a subject id
    pub skipped: usize,
    /// Destination rows with no content record, deleted or not
    pub delete_candidates: usize,
}

impl RunSummary {
    /// Success means no failed items, even if nothing was done.
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Items that reached the destination successfully.
    pub fn items_processed(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// One item that the destination rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub subject_id: String,
    pub phase: SyncPhase,
    pub error: String,
}

/// State of one sync invocation, retained after completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncRun {
    pub id: Uuid,
    pub user: String,
    pub table: String,
    pub category: ContentCategory,
    pub phase: SyncPhase,
    /// Progress within the current phase
    pub processed: usize,
    pub total: usize,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: RunSummary,
    pub failures: Vec<FailedItem>,
    pub warnings: Vec<String>,
    /// Fatal error that ended the run
    pub error: Option<String>,
}

impl SyncRun {
    pub fn new(user: &str, table: &TableRef, category: ContentCategory, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.to_string(),
            table: table.to_string(),
            category,
            phase: SyncPhase::Initializing,
            processed: 0,
            total: 0,
            started_at: now,
            updated_at: now,
            finished_at: None,
            summary: RunSummary::default(),
            failures: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn enter(&mut self, phase: SyncPhase, total: usize, now: DateTime<Utc>) {
        self.phase = phase;
        self.processed = 0;
        self.total = total;
        self.updated_at = now;
    }

    pub fn advance(&mut self, by: usize, now: DateTime<Utc>) {
        self.processed += by;
        self.updated_at = now;
    }

    pub fn fail_item(&mut self, subject_id: impl Into<String>, error: impl Into<String>) {
        self.summary.failed += 1;
        self.failures.push(FailedItem {
            subject_id: subject_id.into(),
            phase: self.phase,
            error: error.into(),
        });
    }

    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.phase = SyncPhase::Done;
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    pub fn abort(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.phase = SyncPhase::Failed;
        self.error = Some(error.into());
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Completed without fatal error and without failed items.
    pub fn success(&self) -> bool {
        self.phase == SyncPhase::Done && self.summary.success()
    }
}

/// Finished runs retained per user and table.
pub const DEFAULT_RUN_HISTORY: usize = 10;

/// Snapshot store of runs, keyed by run id.
///
/// Runs in progress are always kept. Once a run finishes, only the newest
/// `history` finished runs of its user and table are retained.
#[derive(Debug)]
pub struct RunRegistry {
    history: usize,
    runs: Mutex<HashMap<Uuid, SyncRun>>,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::with_history(DEFAULT_RUN_HISTORY)
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: usize) -> Self {
        Self {
            history: history.max(1),
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn history(&self) -> usize {
        self.history
    }

    /// Insert or replace the full snapshot for `run.id`.
    pub fn record(&self, run: &SyncRun) {
        let mut runs = self.lock();
        runs.insert(run.id, run.clone());
        if run.is_finished() {
            self.prune(&mut runs, &run.user, &run.table);
        }
    }

    /// Refresh phase and counters of a recorded run.
    ///
    /// Warnings and failures are left as of the last [`record`](Self::record).
    pub fn touch(&self, run: &SyncRun) {
        let mut runs = self.lock();
        match runs.get_mut(&run.id) {
            Some(entry) => {
                entry.phase = run.phase;
                entry.processed = run.processed;
                entry.total = run.total;
                entry.summary = run.summary;
                entry.updated_at = run.updated_at;
            }
            None => {
                runs.insert(run.id, run.clone());
            }
        }
    }

    fn prune(&self, runs: &mut HashMap<Uuid, SyncRun>, user: &str, table: &str) {
        let mut finished: Vec<(DateTime<Utc>, Uuid)> = runs
            .values()
            .filter(|r| r.is_finished() && r.user == user && r.table == table)
            .map(|r| (r.started_at, r.id))
            .collect();
        if finished.len() <= self.history {
            return;
        }
        finished.sort_by(|a, b| b.cmp(a));
        for (_, id) in finished.split_off(self.history) {
            runs.remove(&id);
        }
    }

    pub fn get(&self, id: Uuid) -> Option<SyncRun> {
        self.lock().get(&id).cloned()
    }

    /// Most recently started run for a user and table.
    pub fn latest_for(&self, user: &str, table: &TableRef) -> Option<SyncRun> {
        let table = table.to_string();
        self.lock()
            .values()
            .filter(|r| r.user == user && r.table == table)
            .max_by_key(|r| r.started_at)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SyncRun>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
