//! Field Reconciliation Engine

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shelf_schema::{FieldKey, FieldTemplate};
use shelf_store::TableRef;
use tracing::{debug, info, warn};

use super::diff::diff_property;
use super::matcher::{FieldMatcher, matcher_for};
use crate::config::{FieldStrategy, ReconcileSettings};
use crate::destination::{Column, ColumnSpec, Credentials, Destination, DestinationResult};
use crate::error::{Error, Result};
use crate::pacing::Pacer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOperation {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureOptions {
    pub strategy: FieldStrategy,
}

/// Result of ensuring one template.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsureOutcome {
    pub key: FieldKey,
    pub column: Column,
    pub operation: FieldOperation,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub key: FieldKey,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub requested: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<EnsureOutcome>,
    pub failures: Vec<FieldFailure>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    fn record(&mut self, outcome: EnsureOutcome) {
        match outcome.operation {
            FieldOperation::Created => self.summary.created += 1,
            FieldOperation::Updated => self.summary.updated += 1,
            FieldOperation::Unchanged => self.summary.unchanged += 1,
        }
        self.results.push(outcome);
    }

    fn fail(&mut self, failure: FieldFailure) {
        self.summary.failed += 1;
        self.failures.push(failure);
    }
}

/// Live columns of one table plus the ids already bound in this call.
struct ColumnPool {
    columns: Vec<Column>,
    claimed: HashSet<String>,
}

impl ColumnPool {
    fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            claimed: HashSet::new(),
        }
    }

    fn claim(&mut self, id: &str) {
        self.claimed.insert(id.to_string());
    }

    fn unclaimed(&self) -> Vec<Column> {
        self.columns
            .iter()
            .filter(|c| !self.claimed.contains(&c.id))
            .cloned()
            .collect()
    }
}

/// Makes destination columns match field templates.
///
/// Templates are processed strictly one at a time with a fixed pause
/// between column mutations.
pub struct FieldReconciler {
    destination: Arc<dyn Destination>,
    matcher: Box<dyn FieldMatcher>,
    max_templates: usize,
    delay: Duration,
}

impl FieldReconciler {
    pub fn new(destination: Arc<dyn Destination>, settings: &ReconcileSettings) -> Self {
        Self {
            destination,
            matcher: matcher_for(settings.matcher, settings.scored_threshold),
            max_templates: settings.max_templates_per_batch,
            delay: settings.field_delay(),
        }
    }

    /// Replace the configured matcher.
    pub fn with_matcher(mut self, matcher: Box<dyn FieldMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn max_templates(&self) -> usize {
        self.max_templates
    }

    /// Ensure a column exists for `template`, correcting it if allowed.
    pub async fn ensure_field(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        template: &FieldTemplate,
        options: EnsureOptions,
    ) -> Result<EnsureOutcome> {
        let mut pool = ColumnPool::new(self.destination.list_columns(credentials, table).await?);
        let mut pacer = Pacer::new(self.delay);
        let outcome = self
            .ensure_against(credentials, table, template, &mut pool, options, &mut pacer)
            .await?;
        Ok(outcome)
    }

    /// Ensure every template in order, isolating per-template failures.
    ///
    /// Fails before any destination call when more templates are requested
    /// than the configured cap. A column bound to one template is not
    /// offered to later templates of the same batch.
    pub async fn ensure_fields_batch(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        templates: &[FieldTemplate],
        options: EnsureOptions,
    ) -> Result<BatchOutcome> {
        if templates.len() > self.max_templates {
            return Err(Error::BatchLimitExceeded {
                requested: templates.len(),
                max: self.max_templates,
            });
        }

        let mut outcome = BatchOutcome {
            summary: BatchSummary {
                requested: templates.len(),
                ..BatchSummary::default()
            },
            ..BatchOutcome::default()
        };
        if templates.is_empty() {
            return Ok(outcome);
        }

        let mut pool = ColumnPool::new(self.destination.list_columns(credentials, table).await?);
        let mut pacer = Pacer::new(self.delay);

        for template in templates {
            match self
                .ensure_against(credentials, table, template, &mut pool, options, &mut pacer)
                .await
            {
                Ok(ensured) => {
                    pool.claim(&ensured.column.id);
                    outcome.record(ensured);
                }
                Err(e) => {
                    warn!(field = %template.key, name = %template.name, error = %e, "field reconciliation failed");
                    outcome.fail(FieldFailure {
                        key: template.key,
                        name: template.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            table = %table,
            matcher = self.matcher.name(),
            created = outcome.summary.created,
            updated = outcome.summary.updated,
            unchanged = outcome.summary.unchanged,
            failed = outcome.summary.failed,
            "field batch reconciled"
        );
        Ok(outcome)
    }

    /// Ensure one template against a known column list, keeping the list current.
    async fn ensure_against(
        &self,
        credentials: &Credentials,
        table: &TableRef,
        template: &FieldTemplate,
        pool: &mut ColumnPool,
        options: EnsureOptions,
        pacer: &mut Pacer,
    ) -> DestinationResult<EnsureOutcome> {
        let mut warnings = Vec::new();

        let available = pool.unclaimed();
        let Some(found) = self.matcher.find(template, &available) else {
            pacer.pause().await;
            let column = self
                .destination
                .create_column(credentials, table, &ColumnSpec::from(template))
                .await?;
            debug!(field = %template.key, column = %column.id, "column created");
            pool.columns.push(column.clone());
            return Ok(EnsureOutcome {
                key: template.key,
                column,
                operation: FieldOperation::Created,
                warnings,
            });
        };

        let confidence = found.confidence;
        let existing = found.column.clone();
        let unchanged = |column: Column, warnings: Vec<String>| EnsureOutcome {
            key: template.key,
            column,
            operation: FieldOperation::Unchanged,
            warnings,
        };

        if !found.is_exact() {
            warnings.push(format!(
                "column '{}' matched '{}' with confidence {:.2}",
                existing.name, template.name, confidence
            ));
        }

        if existing.kind() != Some(template.kind) {
            warnings.push(format!(
                "column '{}' has type {} but {:?} is expected; left unchanged",
                existing.name, existing.type_code, template.kind
            ));
            return Ok(unchanged(existing, warnings));
        }

        if options.strategy == FieldStrategy::SkipExisting {
            return Ok(unchanged(existing, warnings));
        }

        let Some(diff) = diff_property(template, &existing.property) else {
            return Ok(unchanged(existing, warnings));
        };

        // Keep the user's column name; only configuration is corrected.
        let spec = ColumnSpec {
            name: existing.name.clone(),
            kind: template.kind,
            property: diff.corrected,
        };
        pacer.pause().await;
        let updated = self
            .destination
            .update_column(credentials, table, &existing.id, &spec)
            .await?;
        debug!(field = %template.key, column = %updated.id, changed = ?diff.changed, "column corrected");

        if let Some(slot) = pool.columns.iter_mut().find(|c| c.id == updated.id) {
            *slot = updated.clone();
        }
        Ok(EnsureOutcome {
            key: template.key,
            column: updated,
            operation: FieldOperation::Updated,
            warnings,
        })
    }
}
