// src/reload/notifier.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::dag::{BuildGraph, BuildRun};
use crate::errors::NotifierError;
use crate::reload::decision::{ReloadDecision, decide};
use crate::reload::protocol::ReloadMessage;

pub type ClientId = u64;

/// One connected live-reload client.
pub trait ClientSink: Send + Sync {
    /// Deliver one encoded message. An error deregisters the client.
    fn send(&self, text: &str) -> Result<(), NotifierError>;
}

/// Outcome of one [`ReloadNotifier::notify`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub message: Option<ReloadMessage>,
    pub delivered: usize,
    pub dropped: Vec<ClientId>,
}

/// Owns the set of connected clients and pushes one message per build run.
///
/// The client table is write-locked only on connect and disconnect; a
/// broadcast holds the read lock.
pub struct ReloadNotifier {
    clients: RwLock<BTreeMap<ClientId, Arc<dyn ClientSink>>>,
    next_id: AtomicU64,
    /// Directories served to the browser, relative to the project root.
    url_roots: Vec<PathBuf>,
}

impl std::fmt::Debug for ReloadNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadNotifier")
            .field("clients", &self.client_count())
            .field("url_roots", &self.url_roots)
            .finish()
    }
}

impl Default for ReloadNotifier {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ReloadNotifier {
    pub fn new(url_roots: Vec<PathBuf>) -> Self {
        Self {
            clients: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            url_roots,
        }
    }

    pub fn connect(&self, client: Arc<dyn ClientSink>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, client);
        info!(client = id, "live-reload client connected");
        id
    }

    pub fn disconnect(&self, id: ClientId) -> bool {
        let removed = self
            .clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            info!(client = id, "live-reload client disconnected");
        }
        removed
    }

    pub fn client_count(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Browser-facing URL for a written file: the path below the first
    /// serve root containing it, with a leading `/`.
    pub fn url_for(&self, path: &Path) -> String {
        let rel = self
            .url_roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        format!("/{}", rel.to_string_lossy().replace('\\', "/"))
    }

    /// Message warranted by `run`, if any.
    pub fn message_for(&self, run: &BuildRun, graph: &BuildGraph) -> Option<ReloadMessage> {
        match decide(run, graph) {
            ReloadDecision::None => None,
            ReloadDecision::Reload => Some(ReloadMessage::Reload),
            ReloadDecision::InjectStyle(paths) => Some(ReloadMessage::InjectStyle {
                paths: paths.iter().map(|p| self.url_for(p)).collect(),
            }),
        }
    }

    /// Called once per completed build run.
    pub fn notify(&self, run: &BuildRun, graph: &BuildGraph) -> NotifyReport {
        let Some(message) = self.message_for(run, graph) else {
            debug!(run_id = run.id(), "no live-reload message for this run");
            return NotifyReport::default();
        };
        self.broadcast(message)
    }

    /// Push `message` to every client, dropping those that fail.
    pub fn broadcast(&self, message: ReloadMessage) -> NotifyReport {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %NotifierError::from(err), "failed to encode live-reload message");
                return NotifyReport::default();
            }
        };

        let mut delivered = 0;
        let mut dropped = Vec::new();
        {
            let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
            for (id, client) in clients.iter() {
                match client.send(&text) {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        warn!(client = id, error = %err, "live-reload push failed; dropping client");
                        dropped.push(*id);
                    }
                }
            }
        }

        if !dropped.is_empty() {
            let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
            for id in dropped.iter() {
                clients.remove(id);
            }
        }

        info!(message = %text, delivered, dropped = dropped.len(), "live-reload message sent");
        NotifyReport {
            message: Some(message),
            delivered,
            dropped,
        }
    }
}
