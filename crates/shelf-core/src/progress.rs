//! Best-effort progress notifications

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::sync::{RunSummary, SyncPhase};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub run_id: Uuid,
    pub phase: SyncPhase,
    pub processed: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub run_id: Uuid,
    pub success: bool,
    pub items_processed: usize,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("Progress notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receiver of run progress.
///
/// Delivery is best-effort: a returned error is logged and the run continues.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, update: &ProgressUpdate) -> Result<(), NotifyError>;

    fn completed(&self, event: &CompletionEvent) -> Result<(), NotifyError>;
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn progress(&self, _update: &ProgressUpdate) -> Result<(), NotifyError> {
        Ok(())
    }

    fn completed(&self, _event: &CompletionEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

pub(crate) fn send_progress(sink: &dyn ProgressSink, update: ProgressUpdate) {
    if let Err(e) = sink.progress(&update) {
        warn!(run_id = %update.run_id, phase = %update.phase, error = %e, "progress notification dropped");
    }
}

pub(crate) fn send_completion(sink: &dyn ProgressSink, event: CompletionEvent) {
    if let Err(e) = sink.completed(&event) {
        warn!(run_id = %event.run_id, error = %e, "completion notification dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_serialize_in_camel_case() {
        let update = ProgressUpdate {
            run_id: Uuid::nil(),
            phase: SyncPhase::IndexingDestination,
            processed: 3,
            total: 10,
            message: None,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["runId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["phase"], "indexing_destination");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn completion_carries_summary() {
        let event = CompletionEvent {
            run_id: Uuid::nil(),
            success: false,
            items_processed: 4,
            summary: RunSummary {
                created: 4,
                failed: 1,
                ..RunSummary::default()
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["itemsProcessed"], 4);
        assert_eq!(json["summary"]["failed"], 1);
    }
}
