// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use super::TriggerReason;
use crate::types::TaskName;

/// Rebuild requests that arrive while a build run is executing.
///
/// At most one future run is kept: every request recorded while a run is
/// in flight is merged into the same pending batch, so a burst of changes
/// during a long build produces exactly one follow-up run over the union of
/// their targets.
#[derive(Debug, Default)]
pub struct RebuildQueue {
    pending: Option<(BTreeSet<TaskName>, TriggerReason)>,
}

impl RebuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no queued requests.
    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// Targets that would run next, if any.
    pub fn pending_targets(&self) -> Option<&BTreeSet<TaskName>> {
        self.pending.as_ref().map(|(targets, _)| targets)
    }

    /// Merge `targets` into the pending batch.
    ///
    /// The batch keeps the reason of its first request.
    pub fn record(&mut self, targets: BTreeSet<TaskName>, reason: TriggerReason) {
        match self.pending.as_mut() {
            Some((batch, _)) => {
                let before = batch.len();
                batch.extend(targets);
                debug!(added = batch.len() - before, total = batch.len(), "merged request into queued batch");
            }
            None => {
                debug!(?targets, ?reason, "queued rebuild request");
                self.pending = Some((targets, reason));
            }
        }
    }

    /// Take the pending batch, leaving the queue empty.
    pub fn drain(&mut self) -> Option<(BTreeSet<TaskName>, TriggerReason)> {
        self.pending.take()
    }
}
