// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{BuildRun, Scheduler};
use crate::fs::{FileSystem, RealFileSystem};
use crate::reload::ReloadNotifier;
use crate::types::{ExitStatus, PipelineMode};

use super::core::CoreRuntime;
use super::report;
use super::{CoreCommand, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// orchestration semantics. This struct handles async IO: reading events
/// from the channel, spawning scheduler runs and pushing reload messages.
pub struct Runtime {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    /// Finished runs are fed back through the same channel.
    event_tx: mpsc::Sender<RuntimeEvent>,
    scheduler: Arc<Scheduler>,
    notifier: Option<Arc<ReloadNotifier>>,
    /// Project root used to size build outputs in build-once mode.
    size_root: Option<PathBuf>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: CoreRuntime,
        event_tx: mpsc::Sender<RuntimeEvent>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            scheduler,
            notifier: None,
            size_root: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<ReloadNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Log artifact sizes under `root` after build-once runs.
    pub fn with_size_report(mut self, root: impl Into<PathBuf>) -> Self {
        self.size_root = Some(root.into());
        self
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (start runs, notify, exit).
    pub async fn run(mut self) -> ExitStatus {
        info!(mode = ?self.core.options().mode, "pipeline runtime started");

        let mut status = None;
        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);

            for command in step.commands {
                if let Some(exit) = self.execute_command(command).await {
                    status = Some(exit);
                }
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        let status = status.unwrap_or_else(|| self.core.exit_status());
        info!(?status, "runtime exiting");
        status
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Option<ExitStatus> {
        match command {
            CoreCommand::StartRun { targets, reason } => {
                info!(?targets, ?reason, "starting build");
                let scheduler = Arc::clone(&self.scheduler);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let event = match scheduler.run(targets.iter().cloned()).await {
                        Ok(run) => RuntimeEvent::RunFinished(Arc::new(run)),
                        Err(error) => RuntimeEvent::RunRejected { targets, error },
                    };
                    if tx.send(event).await.is_err() {
                        debug!("runtime gone before run finished");
                    }
                });
            }
            CoreCommand::Report(run) => {
                report::log_run(&run);
                if self.core.options().mode == PipelineMode::BuildOnce {
                    self.report_sizes(&run);
                }
            }
            CoreCommand::Notify(run) => self.notify(run).await,
            CoreCommand::RequestExit(status) => {
                info!(?status, "core issued RequestExit command");
                return Some(status);
            }
        }
        None
    }

    fn report_sizes(&self, run: &BuildRun) {
        let Some(root) = self.size_root.as_deref() else {
            return;
        };
        let lines = report::size_report(&RealFileSystem as &dyn FileSystem, root, run);
        report::log_sizes(&lines);
    }

    async fn notify(&self, run: Arc<BuildRun>) {
        let Some(notifier) = self.notifier.as_ref().map(Arc::clone) else {
            return;
        };
        let graph = Arc::clone(self.scheduler.graph());
        // Pushing to sockets blocks.
        let res = tokio::task::spawn_blocking(move || notifier.notify(&run, &graph)).await;
        if let Err(err) = res {
            warn!(error = %err, "live-reload notification task failed");
        }
    }
}
