//! Incremental Sync Engine
//!
//! A run moves through a fixed sequence of phases:
//!
//! ```text
//! initializing -> bootstrapping_bindings? -> indexing_destination -> classifying
//!     -> creating -> updating -> deleting? -> done
//! ```
//!
//! Any fatal error ends the run in `failed`. Failures of individual batches
//! or deletes are counted and the run carries on.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shelf_schema::{ContentCategory, ContentRecord, FieldKey, TemplateRegistry};
use shelf_store::{BindingStore, FieldBinding, TableRef};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::classify::{DeleteCandidate, PlannedUpdate, classify};
use super::index::DestinationIndex;
use super::payload::{content_values, row_cells};
use super::run::{RunRegistry, RunSummary, SyncPhase, SyncRun};
use crate::config::SyncSettings;
use crate::destination::{Cells, Credentials, Destination, PageRequest, RecordUpdate};
use crate::error::{Error, Result};
use crate::pacing::Pacer;
use crate::progress::{
    CompletionEvent, NoopProgress, ProgressSink, ProgressUpdate, send_completion, send_progress,
};
use crate::reconcile::{EnsureOptions, FieldReconciler};
use crate::source::ContentSource;

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Update every indexed record regardless of its content hash
    pub full_sync: bool,
    /// Delete destination rows that no longer have a content record
    pub delete_missing: bool,
    /// Cap on content records fetched
    pub limit: Option<usize>,
}

impl SyncOptions {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            full_sync: false,
            delete_missing: settings.delete_missing,
            limit: settings.fetch_limit,
        }
    }
}

/// One category synced into one destination table.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub user: String,
    pub credentials: Credentials,
    pub table: TableRef,
    pub category: ContentCategory,
    pub options: SyncOptions,
}

impl SyncRequest {
    pub fn new(
        user: impl Into<String>,
        credentials: Credentials,
        table: TableRef,
        category: ContentCategory,
    ) -> Self {
        Self {
            user: user.into(),
            credentials,
            table,
            category,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }
}

/// How one category of a multi-category run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryResult {
    Completed { run: SyncRun },
    /// Content could not be retrieved; nothing was mutated
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryOutcome {
    pub category: ContentCategory,
    pub table: String,
    pub result: CategoryResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MultiSyncReport {
    pub outcomes: Vec<CategoryOutcome>,
}

impl MultiSyncReport {
    /// Every category completed with zero failed items.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| match &o.result {
            CategoryResult::Completed { run } => run.success(),
            _ => false,
        })
    }

    /// Summed counts over completed categories.
    pub fn totals(&self) -> RunSummary {
        let mut total = RunSummary::default();
        for outcome in &self.outcomes {
            if let CategoryResult::Completed { run } = &outcome.result {
                let s = run.summary;
                total.created += s.created;
                total.updated += s.updated;
                total.deleted += s.deleted;
                total.failed += s.failed;
                total.unchanged += s.unchanged;
                total.skipped += s.skipped;
                total.delete_candidates += s.delete_candidates;
            }
        }
        total
    }

    pub fn skipped(&self) -> impl Iterator<Item = &CategoryOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, CategoryResult::Skipped { .. }))
    }
}

/// Orchestrates sync runs.
///
/// The engine does not coordinate concurrent runs; callers must not run
/// two syncs against the same user and table at once.
pub struct SyncEngine {
    destination: Arc<dyn Destination>,
    source: Arc<dyn ContentSource>,
    bindings: Arc<BindingStore>,
    registry: Arc<TemplateRegistry>,
    reconciler: FieldReconciler,
    progress: Arc<dyn ProgressSink>,
    settings: SyncSettings,
    runs: RunRegistry,
}

impl SyncEngine {
    pub fn new(
        destination: Arc<dyn Destination>,
        source: Arc<dyn ContentSource>,
        bindings: Arc<BindingStore>,
        settings: SyncSettings,
    ) -> Self {
        let reconciler = FieldReconciler::new(destination.clone(), &settings.reconcile);
        Self {
            destination,
            source,
            bindings,
            registry: Arc::new(TemplateRegistry::with_builtins()),
            reconciler,
            progress: Arc::new(NoopProgress),
            runs: RunRegistry::with_history(settings.run_history),
            settings,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TemplateRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_reconciler(mut self, reconciler: FieldReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn reconciler(&self) -> &FieldReconciler {
        &self.reconciler
    }

    pub fn run_status(&self, id: Uuid) -> Option<SyncRun> {
        self.runs.get(id)
    }

    pub fn latest_run(&self, user: &str, table: &TableRef) -> Option<SyncRun> {
        self.runs.latest_for(user, table)
    }

    /// Run one incremental sync.
    ///
    /// Fatal errors are returned after the run has been recorded as failed
    /// and the completion event sent.
    #[instrument(skip_all, fields(user = %request.user, table = %request.table, category = %request.category))]
    pub async fn sync(&self, request: &SyncRequest) -> Result<SyncRun> {
        let mut run = SyncRun::new(&request.user, &request.table, request.category, self.now());
        info!(run_id = %run.id, full_sync = request.options.full_sync, "sync run started");
        self.snapshot(&run);

        match self.execute(request, &mut run).await {
            Ok(()) => {
                run.finish(self.now());
                self.snapshot(&run);
                info!(
                    run_id = %run.id,
                    created = run.summary.created,
                    updated = run.summary.updated,
                    deleted = run.summary.deleted,
                    unchanged = run.summary.unchanged,
                    failed = run.summary.failed,
                    "sync run finished"
                );
                self.complete(&run);
                Ok(run)
            }
            Err(e) => {
                error!(run_id = %run.id, phase = %run.phase, error = %e, "sync run failed");
                run.abort(e.to_string(), self.now());
                self.snapshot(&run);
                self.complete(&run);
                Err(e)
            }
        }
    }

    /// Sync several categories one after another.
    ///
    /// A content-source failure skips that category; the others still run.
    pub async fn sync_all(&self, requests: &[SyncRequest]) -> MultiSyncReport {
        let mut report = MultiSyncReport::default();
        for request in requests {
            let result = match self.sync(request).await {
                Ok(run) => CategoryResult::Completed { run },
                Err(Error::Source(e)) => {
                    warn!(category = %request.category, error = %e, "content source failed; category skipped");
                    CategoryResult::Skipped {
                        reason: e.to_string(),
                    }
                }
                Err(e) => CategoryResult::Failed {
                    error: e.to_string(),
                },
            };
            report.outcomes.push(CategoryOutcome {
                category: request.category,
                table: request.table.to_string(),
                result,
            });
        }

        let totals = report.totals();
        info!(
            categories = report.outcomes.len(),
            created = totals.created,
            updated = totals.updated,
            failed = totals.failed,
            "multi-category sync finished"
        );
        report
    }

    async fn execute(&self, request: &SyncRequest, run: &mut SyncRun) -> Result<()> {
        let limit = request.options.limit.or(self.settings.fetch_limit);
        let records = self
            .source
            .fetch(&request.user, request.category, limit)
            .await?;
        debug!(count = records.len(), "content records fetched");

        let binding = match self.bindings.get(&request.user, &request.table)? {
            Some(binding) => binding,
            None => self.bootstrap(request, run).await?,
        };
        if binding.category != request.category {
            return Err(Error::CategoryMismatch {
                table: request.table.clone(),
                bound: binding.category,
                requested: request.category,
            });
        }
        let subject_column = binding
            .subject_column()
            .ok_or_else(|| Error::SubjectFieldUnresolved {
                table: request.table.clone(),
            })?
            .to_string();

        let index = self.index_destination(request, &subject_column, run).await?;

        self.enter(run, SyncPhase::Classifying, records.len());
        let plan = classify(
            &records,
            &index,
            &binding,
            &self.registry,
            request.options.full_sync,
        );
        if !plan.skipped.is_empty() {
            warn!(count = plan.skipped.len(), positions = ?plan.skipped, "content records without subject id skipped");
            run.warnings.push(format!(
                "{} content records without subject id skipped",
                plan.skipped.len()
            ));
        }
        run.summary.unchanged = plan.unchanged.len();
        run.summary.skipped = plan.skipped.len();
        run.summary.delete_candidates = plan.delete_candidates.len();
        run.advance(records.len(), self.now());
        self.publish(run);
        debug!(
            create = plan.create.len(),
            update = plan.update.len(),
            unchanged = plan.unchanged.len(),
            delete_candidates = plan.delete_candidates.len(),
            "records classified"
        );

        self.create_records(request, &binding, &plan.create, run).await;
        self.update_records(request, &binding, &plan.update, run).await;

        if request.options.delete_missing {
            self.delete_records(request, &plan.delete_candidates, run).await;
        } else if !plan.delete_candidates.is_empty() {
            info!(
                count = plan.delete_candidates.len(),
                "deletion disabled; delete candidates left in place"
            );
        }
        Ok(())
    }

    /// Build a binding from the category's full template set and persist it.
    async fn bootstrap(&self, request: &SyncRequest, run: &mut SyncRun) -> Result<FieldBinding> {
        let templates = self.registry.templates_for(request.category);
        self.enter(run, SyncPhase::BootstrappingBindings, templates.len());
        info!(templates = templates.len(), "no field binding; bootstrapping");

        let options = EnsureOptions {
            strategy: self.settings.reconcile.strategy,
        };
        let mut fields = BTreeMap::new();
        for chunk in templates.chunks(self.reconciler.max_templates().max(1)) {
            let outcome = self
                .reconciler
                .ensure_fields_batch(&request.credentials, &request.table, chunk, options)
                .await?;
            for ensured in outcome.results {
                run.warnings.extend(ensured.warnings);
                fields.insert(ensured.key, ensured.column.id);
            }
            for failure in outcome.failures {
                run.warnings.push(format!(
                    "field '{}' ({}) not bound: {}",
                    failure.name, failure.key, failure.error
                ));
            }
            run.advance(chunk.len(), self.now());
            self.publish(run);
        }

        if !fields.contains_key(&FieldKey::SubjectId) {
            return Err(Error::SubjectFieldUnresolved {
                table: request.table.clone(),
            });
        }

        let binding = FieldBinding::new(request.category, fields, self.now());
        self.bindings
            .set(&request.user, &request.table, binding.clone())?;
        info!(fields = binding.fields.len(), "field binding bootstrapped");
        Ok(binding)
    }

    /// Page through every destination record and index it by subject id.
    async fn index_destination(
        &self,
        request: &SyncRequest,
        subject_column: &str,
        run: &mut SyncRun,
    ) -> Result<DestinationIndex> {
        self.enter(run, SyncPhase::IndexingDestination, 0);
        let mut pacer = Pacer::new(self.settings.page_delay());
        let mut records = Vec::new();
        let mut page_token = None;

        loop {
            pacer.pause().await;
            let page = self
                .destination
                .list_records(
                    &request.credentials,
                    &request.table,
                    PageRequest {
                        page_size: self.settings.page_size,
                        page_token: page_token.take(),
                    },
                )
                .await
                .map_err(|source| Error::Indexing {
                    table: request.table.clone(),
                    source,
                })?;

            let fetched = page.records.len();
            records.extend(page.records);
            run.total += fetched;
            run.advance(fetched, self.now());
            self.publish(run);

            match page.next_page_token {
                Some(token) if page.has_more => page_token = Some(token),
                _ => {
                    if page.has_more {
                        warn!("destination reported more records without a page token");
                    }
                    break;
                }
            }
        }

        let index = DestinationIndex::build(records, subject_column);
        if index.skipped() > 0 {
            debug!(skipped = index.skipped(), "destination records without subject id ignored");
        }
        if !index.duplicates().is_empty() {
            run.warnings.push(format!(
                "{} duplicate subject ids in destination",
                index.duplicates().len()
            ));
        }
        debug!(indexed = index.len(), "destination indexed");
        Ok(index)
    }

    async fn create_records(
        &self,
        request: &SyncRequest,
        binding: &FieldBinding,
        records: &[&ContentRecord],
        run: &mut SyncRun,
    ) {
        self.enter(run, SyncPhase::Creating, records.len());
        let mut pacer = Pacer::new(self.settings.batch_delay());

        for batch in records.chunks(self.settings.insert_batch_size.max(1)) {
            let synced_at = self.synced_at();
            let rows: Vec<Cells> = batch
                .iter()
                .map(|record| self.row_for(record, binding, true, &[], synced_at, run))
                .collect();

            pacer.pause().await;
            match self
                .destination
                .insert_records(&request.credentials, &request.table, rows)
                .await
            {
                Ok(ids) => {
                    let inserted = ids.len().min(batch.len());
                    run.summary.created += inserted;
                    debug!(inserted, "insert batch applied");
                    if inserted < batch.len() {
                        warn!(size = batch.len(), inserted, "destination returned fewer record ids than rows");
                        let reason = format!(
                            "destination returned {} record ids for {} rows",
                            ids.len(),
                            batch.len()
                        );
                        for record in &batch[inserted..] {
                            run.fail_item(record.subject_id.trim(), reason.clone());
                        }
                    }
                }
                Err(e) => {
                    warn!(size = batch.len(), error = %e, "insert batch failed");
                    for record in batch {
                        run.fail_item(record.subject_id.trim(), e.to_string());
                    }
                }
            }
            run.advance(batch.len(), self.now());
            self.publish(run);
        }
    }

    async fn update_records(
        &self,
        request: &SyncRequest,
        binding: &FieldBinding,
        planned: &[PlannedUpdate<'_>],
        run: &mut SyncRun,
    ) {
        self.enter(run, SyncPhase::Updating, planned.len());
        let mut pacer = Pacer::new(self.settings.batch_delay());

        for batch in planned.chunks(self.settings.update_batch_size.max(1)) {
            let synced_at = self.synced_at();
            let updates: Vec<RecordUpdate> = batch
                .iter()
                .map(|p| RecordUpdate {
                    record_id: p.record_id.clone(),
                    cells: self.row_for(p.record, binding, false, &p.cleared, synced_at, run),
                })
                .collect();

            pacer.pause().await;
            match self
                .destination
                .update_records(&request.credentials, &request.table, updates)
                .await
            {
                Ok(()) => {
                    run.summary.updated += batch.len();
                    debug!(size = batch.len(), "update batch applied");
                }
                Err(e) => {
                    warn!(size = batch.len(), error = %e, "update batch failed");
                    for p in batch {
                        run.fail_item(p.record.subject_id.trim(), e.to_string());
                    }
                }
            }
            run.advance(batch.len(), self.now());
            self.publish(run);
        }
    }

    /// Deletes are issued one record at a time.
    async fn delete_records(
        &self,
        request: &SyncRequest,
        candidates: &[DeleteCandidate],
        run: &mut SyncRun,
    ) {
        self.enter(run, SyncPhase::Deleting, candidates.len());
        let mut pacer = Pacer::new(self.settings.delete_delay());

        for candidate in candidates {
            pacer.pause().await;
            match self
                .destination
                .delete_record(&request.credentials, &request.table, &candidate.record_id)
                .await
            {
                Ok(()) => run.summary.deleted += 1,
                Err(e) => {
                    warn!(subject = %candidate.subject_id, record_id = %candidate.record_id, error = %e, "delete failed");
                    run.fail_item(candidate.subject_id.as_str(), e.to_string());
                }
            }
            run.advance(1, self.now());
            self.publish(run);
        }
    }

    fn row_for(
        &self,
        record: &ContentRecord,
        binding: &FieldBinding,
        include_identity: bool,
        cleared: &[FieldKey],
        synced_at: Option<DateTime<Utc>>,
        run: &mut SyncRun,
    ) -> Cells {
        let mapped = content_values(record, binding, &self.registry);
        for e in &mapped.errors {
            warn!(subject = %record.subject_id, error = %e, "field omitted");
            run.warnings
                .push(format!("{}: {e}", record.subject_id.trim()));
        }
        row_cells(&mapped.values, binding, include_identity, cleared, synced_at)
    }

    fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.settings.stamp_synced_at.then(|| self.now())
    }

    fn now(&self) -> DateTime<Utc> {
        self.bindings.clock().now()
    }

    fn enter(&self, run: &mut SyncRun, phase: SyncPhase, total: usize) {
        run.enter(phase, total, self.now());
        debug!(phase = %phase, total, "phase entered");
        self.snapshot(run);
    }

    /// Record the full run and notify the progress sink.
    fn snapshot(&self, run: &SyncRun) {
        self.runs.record(run);
        self.notify(run);
    }

    /// Refresh the recorded counters and notify the progress sink.
    fn publish(&self, run: &SyncRun) {
        self.runs.touch(run);
        self.notify(run);
    }

    fn notify(&self, run: &SyncRun) {
        send_progress(
            self.progress.as_ref(),
            ProgressUpdate {
                run_id: run.id,
                phase: run.phase,
                processed: run.processed,
                total: run.total,
                message: run.error.clone(),
            },
        );
    }

    fn complete(&self, run: &SyncRun) {
        send_completion(
            self.progress.as_ref(),
            CompletionEvent {
                run_id: run.id,
                success: run.success(),
                items_processed: run.summary.items_processed(),
                summary: run.summary,
            },
        );
    }
}
