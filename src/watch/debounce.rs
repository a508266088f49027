// src/watch/debounce.rs

//! Coalescing bursts of file changes into rebuild requests.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, trace};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::types::{ChangeEvent, TaskName};
use crate::watch::hash::ContentFilter;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchSubscriptions;

/// Turns raw change events into [`RuntimeEvent::RebuildRequested`].
///
/// A batch opens on the first change that matches a subscription and closes
/// once `window` elapses with no further matching change. Each batch yields
/// exactly one request whose targets are every task subscribed to any path
/// in the batch. Changes matching no subscription are dropped and do not
/// extend the window.
#[derive(Debug)]
pub struct Debouncer {
    root: PathBuf,
    subscriptions: WatchSubscriptions,
    window: Duration,
    filter: Option<ContentFilter>,
}

impl Debouncer {
    pub fn new(root: impl Into<PathBuf>, subscriptions: WatchSubscriptions, window: Duration) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root,
            subscriptions,
            window,
            filter: None,
        }
    }

    /// Drop modify events whose content hash is unchanged.
    pub fn with_content_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Tasks concerned by `event`, after content filtering.
    fn targets_of(&mut self, event: &ChangeEvent) -> BTreeSet<TaskName> {
        let Some(rel) = relative_str(&self.root, &event.path) else {
            trace!(path = ?event.path, "change outside project root; ignoring");
            return BTreeSet::new();
        };
        let targets = self.subscriptions.tasks_for(&rel);
        if targets.is_empty() {
            trace!(path = %rel, "change matches no subscription; ignoring");
            return targets;
        }
        if let Some(filter) = self.filter.as_mut()
            && !filter.is_change(event)
        {
            return BTreeSet::new();
        }
        debug!(path = %rel, kind = ?event.kind, ?targets, "relevant change");
        targets
    }

    /// Consume changes until `changes` closes, emitting one request per batch.
    pub async fn run(
        mut self,
        mut changes: mpsc::UnboundedReceiver<ChangeEvent>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) {
        info!(window = ?self.window, "debouncer started");

        'outer: while let Some(event) = changes.recv().await {
            let mut batch = self.targets_of(&event);
            if batch.is_empty() {
                continue;
            }
            let mut events = 1usize;
            let mut deadline = Instant::now() + self.window;

            let closed = loop {
                match timeout_at(deadline, changes.recv()).await {
                    Ok(Some(event)) => {
                        let targets = self.targets_of(&event);
                        if !targets.is_empty() {
                            batch.extend(targets);
                            events += 1;
                            deadline = Instant::now() + self.window;
                        }
                    }
                    Ok(None) => break true,
                    Err(_) => break false,
                }
            };

            info!(events, targets = ?batch, "change batch settled; requesting rebuild");
            let request = RuntimeEvent::RebuildRequested {
                targets: batch,
                reason: TriggerReason::FileWatch,
            };
            if runtime_tx.send(request).await.is_err() || closed {
                break 'outer;
            }
        }

        debug!("debouncer finished");
    }

    pub fn spawn(
        self,
        changes: mpsc::UnboundedReceiver<ChangeEvent>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(changes, runtime_tx))
    }
}
