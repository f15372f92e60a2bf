//! [`RecordingProgress`]: a progress sink that remembers every event.

use std::sync::Mutex;

use shelf_core::{CompletionEvent, NotifyError, ProgressSink, ProgressUpdate, SyncPhase};

#[derive(Debug, Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<ProgressUpdate>>,
    completions: Mutex<Vec<CompletionEvent>>,
    failing: bool,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that records events but reports every delivery as failed.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn completions(&self) -> Vec<CompletionEvent> {
        self.completions.lock().unwrap().clone()
    }

    /// Distinct phases in the order they were first reported.
    pub fn phases(&self) -> Vec<SyncPhase> {
        let mut phases = Vec::new();
        for update in self.updates.lock().unwrap().iter() {
            if phases.last() != Some(&update.phase) {
                phases.push(update.phase);
            }
        }
        phases
    }

    fn outcome(&self) -> Result<(), NotifyError> {
        if self.failing {
            Err(NotifyError("channel closed".into()))
        } else {
            Ok(())
        }
    }
}

impl ProgressSink for RecordingProgress {
    fn progress(&self, update: &ProgressUpdate) -> Result<(), NotifyError> {
        self.updates.lock().unwrap().push(update.clone());
        self.outcome()
    }

    fn completed(&self, event: &CompletionEvent) -> Result<(), NotifyError> {
        self.completions.lock().unwrap().push(event.clone());
        self.outcome()
    }
}
