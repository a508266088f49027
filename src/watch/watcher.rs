// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::WatchError;
use crate::types::{ChangeEvent, ChangeKind};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handle for the filesystem watcher.
///
/// Keeps the underlying notify watcher alive; dropping it stops watching.
pub struct WatcherHandle {
    _inner: Box<dyn Watcher + Send>,
    polling: bool,
    roots: Vec<PathBuf>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("polling", &self.polling)
            .field("roots", &self.roots)
            .finish()
    }
}

impl WatcherHandle {
    /// Whether the watcher fell back to polling.
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Absolute directories being watched.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Translate a notify event into per-path change events.
pub fn change_events(event: &Event) -> Vec<ChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Deleted,
        EventKind::Modify(ModifyKind::Name(_)) => {
            return event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        ChangeKind::Created
                    } else {
                        ChangeKind::Deleted
                    };
                    ChangeEvent::new(p.clone(), kind)
                })
                .collect();
        }
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .map(|p| ChangeEvent::new(p.clone(), kind))
        .collect()
}

fn make_handler(tx: mpsc::UnboundedSender<ChangeEvent>) -> impl Fn(notify::Result<Event>) + Send + 'static {
    move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for change in change_events(&event) {
                // Receiver gone means the pipeline is shutting down.
                let _ = tx.send(change);
            }
        }
        Err(err) => {
            warn!(error = %err, "file watch error");
        }
    }
}

/// Start watching `roots` (relative to `root`) recursively.
///
/// Roots that do not exist yet are skipped. When the native backend cannot
/// be created or cannot register a root, the watcher degrades to polling.
pub fn spawn_watcher(
    root: &Path,
    roots: &[PathBuf],
    change_tx: mpsc::UnboundedSender<ChangeEvent>,
) -> Result<WatcherHandle, WatchError> {
    if !root.is_dir() {
        return Err(WatchError::MissingRoot(root.to_path_buf()));
    }
    // Canonicalize once so event paths share a stable prefix.
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    let dirs: Vec<PathBuf> = roots
        .iter()
        .map(|r| root.join(r))
        .filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                warn!(?dir, "watch root does not exist; skipping");
            }
            exists
        })
        .collect();

    match native(&dirs, change_tx.clone()) {
        Ok(watcher) => {
            info!(roots = ?dirs, "file watcher started");
            Ok(WatcherHandle {
                _inner: watcher,
                polling: false,
                roots: dirs,
            })
        }
        Err(err) => {
            warn!(error = %err, "native file watcher unavailable; falling back to polling");
            let config = Config::default().with_poll_interval(POLL_INTERVAL);
            let mut watcher = PollWatcher::new(make_handler(change_tx), config)?;
            for dir in dirs.iter() {
                watcher.watch(dir, RecursiveMode::Recursive)?;
            }
            info!(roots = ?dirs, interval = ?POLL_INTERVAL, "polling file watcher started");
            Ok(WatcherHandle {
                _inner: Box::new(watcher),
                polling: true,
                roots: dirs,
            })
        }
    }
}

fn native(
    dirs: &[PathBuf],
    change_tx: mpsc::UnboundedSender<ChangeEvent>,
) -> Result<Box<dyn Watcher + Send>, notify::Error> {
    let mut watcher = RecommendedWatcher::new(make_handler(change_tx), Config::default())?;
    for dir in dirs {
        debug!(?dir, "watching");
        watcher.watch(dir, RecursiveMode::Recursive)?;
    }
    Ok(Box::new(watcher))
}
