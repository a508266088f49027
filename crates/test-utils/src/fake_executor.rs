use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::dag::{Task, TaskOutcome};
use assetpipe::errors::Diagnostic;
use assetpipe::exec::{ExecFuture, TaskExecutor};

#[derive(Default)]
struct FakeState {
    failing: Mutex<HashSet<String>>,
    outputs: Mutex<HashMap<String, Vec<PathBuf>>>,
    delay: Mutex<Duration>,
    delays: Mutex<HashMap<String, Duration>>,
    executed: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// A fake executor that:
/// - records which tasks were "run", in start order
/// - optionally sleeps to simulate work (so concurrency can be observed)
/// - fails the tasks marked with [`FakeExecutor::fail`]
/// - reports `output/<task>.out` as written unless outputs were set.
///
/// Clones share state, so a test can keep one handle while the scheduler
/// owns another.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<FakeState>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.state.delay.lock().unwrap() = delay;
        self
    }

    /// Per-task delay, overriding the default one.
    pub fn set_delay(&self, task: &str, delay: Duration) {
        self.state.delays.lock().unwrap().insert(task.to_string(), delay);
    }

    pub fn fail(&self, task: &str) {
        self.state.failing.lock().unwrap().insert(task.to_string());
    }

    pub fn recover(&self, task: &str) {
        self.state.failing.lock().unwrap().remove(task);
    }

    pub fn set_outputs(&self, task: &str, paths: &[&str]) {
        self.state.outputs.lock().unwrap().insert(
            task.to_string(),
            paths.iter().map(PathBuf::from).collect(),
        );
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.executed.lock().unwrap().clone()
    }

    /// Tasks in completion order.
    pub fn finished(&self) -> Vec<String> {
        self.state.finished.lock().unwrap().clone()
    }

    pub fn execution_count(&self, task: &str) -> usize {
        self.state
            .executed
            .lock()
            .unwrap()
            .iter()
            .filter(|t| *t == task)
            .count()
    }

    pub fn clear_log(&self) {
        self.state.executed.lock().unwrap().clear();
        self.state.finished.lock().unwrap().clear();
    }

    /// Highest number of tasks observed executing at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl TaskExecutor for FakeExecutor {
    fn execute(&self, task: Arc<Task>) -> ExecFuture {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            state.max_in_flight.fetch_max(now, Ordering::SeqCst);
            state.executed.lock().unwrap().push(task.name.clone());

            let delay = state
                .delays
                .lock()
                .unwrap()
                .get(&task.name)
                .copied()
                .unwrap_or_else(|| *state.delay.lock().unwrap());
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            state.in_flight.fetch_sub(1, Ordering::SeqCst);
            state.finished.lock().unwrap().push(task.name.clone());

            if state.failing.lock().unwrap().contains(&task.name) {
                return TaskOutcome::Failed(Diagnostic::new(format!(
                    "injected failure in '{}'",
                    task.name
                )));
            }
            let written = state
                .outputs
                .lock()
                .unwrap()
                .get(&task.name)
                .cloned()
                .unwrap_or_else(|| vec![PathBuf::from(format!("output/{}.out", task.name))]);
            TaskOutcome::Succeeded { written }
        })
    }
}
