// tests/orchestrator.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use assetpipe::adapters::{ScriptOptions, StyleOptions};
use assetpipe::config::defaults::DEFAULT_PIPELINE;
use assetpipe::config::parse_and_validate;
use assetpipe::dag::{BuildGraph, BuildRun, Scheduler, Task, TaskAction, TaskOutcome};
use assetpipe::engine::{
    CoreCommand, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
};
use assetpipe::errors::{ConfigError, Diagnostic};
use assetpipe::reload::{ReloadMessage, ReloadNotifier};
use assetpipe::types::{ChangeEvent, ChangeKind, ExitStatus, PipelineMode};
use assetpipe::watch::{Debouncer, WatchSubscriptions};
use assetpipe_test_utils::builders::{graph_of, group, linear_chain};
use assetpipe_test_utils::fake_executor::FakeExecutor;
use assetpipe_test_utils::recording_client::RecordingClient;
use assetpipe_test_utils::{init_tracing, with_timeout};

fn once() -> RuntimeOptions {
    RuntimeOptions {
        mode: PipelineMode::BuildOnce,
    }
}

fn watch() -> RuntimeOptions {
    RuntimeOptions {
        mode: PipelineMode::Watch,
    }
}

fn targets(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn request(names: &[&str]) -> RuntimeEvent {
    RuntimeEvent::RebuildRequested {
        targets: targets(names),
        reason: TriggerReason::FileWatch,
    }
}

/// Drive a run by hand; tasks named in `failing` fail.
fn finished_run(graph: &BuildGraph, names: &[&str], failing: &[&str]) -> Arc<BuildRun> {
    let mut run = BuildRun::plan(graph, 1, names.iter().copied()).unwrap();
    loop {
        let ready = run.start_ready();
        if ready.is_empty() {
            break;
        }
        for task in ready {
            let outcome = if failing.contains(&task.as_str()) {
                TaskOutcome::Failed(Diagnostic::new("boom"))
            } else {
                TaskOutcome::Succeeded { written: vec![] }
            };
            run.record_outcome(&task, outcome);
        }
    }
    assert!(run.is_finished());
    Arc::new(run)
}

fn start_targets(commands: &[CoreCommand]) -> Option<BTreeSet<String>> {
    commands.iter().find_map(|c| match c {
        CoreCommand::StartRun { targets, .. } => Some(targets.clone()),
        _ => None,
    })
}

fn exit_status(commands: &[CoreCommand]) -> Option<ExitStatus> {
    commands.iter().find_map(|c| match c {
        CoreCommand::RequestExit(status) => Some(*status),
        _ => None,
    })
}

// ---- pure core -----------------------------------------------------------

#[test]
fn build_once_exits_after_its_run() {
    let graph = linear_chain(&["a", "b"]);
    let mut core = CoreRuntime::new(once());

    let step = core.step(request(&["b"]));
    assert!(step.keep_running);
    assert_eq!(start_targets(&step.commands), Some(targets(&["b"])));
    assert!(!core.is_idle());

    let step = core.step(RuntimeEvent::RunFinished(finished_run(&graph, &["b"], &[])));
    assert!(!step.keep_running);
    assert!(matches!(step.commands[0], CoreCommand::Report(_)));
    assert!(!step.commands.iter().any(|c| matches!(c, CoreCommand::Notify(_))));
    assert_eq!(exit_status(&step.commands), Some(ExitStatus::Success));
    assert_eq!(core.runs_finished(), 1);
}

#[test]
fn build_once_reports_failure() {
    let graph = linear_chain(&["clean", "compile", "minify"]);
    let mut core = CoreRuntime::new(once());

    core.step(request(&["minify"]));
    let run = finished_run(&graph, &["minify"], &["compile"]);
    let step = core.step(RuntimeEvent::RunFinished(run));

    assert_eq!(exit_status(&step.commands), Some(ExitStatus::Failure));
    assert_eq!(core.exit_status(), ExitStatus::Failure);
}

#[test]
fn requests_during_a_run_are_merged_into_one_follow_up() {
    let graph = graph_of(vec![group("a", &[]), group("b", &[]), group("c", &[])]);
    let mut core = CoreRuntime::new(watch());

    core.step(request(&["a"]));
    let step = core.step(request(&["b"]));
    assert!(step.commands.is_empty());
    let step = core.step(request(&["c", "b"]));
    assert!(step.commands.is_empty());
    assert_eq!(
        core.queued_targets(),
        Some(vec!["b".to_string(), "c".to_string()])
    );

    let step = core.step(RuntimeEvent::RunFinished(finished_run(&graph, &["a"], &[])));
    assert!(step.keep_running);
    assert_eq!(start_targets(&step.commands), Some(targets(&["b", "c"])));
    assert!(core.queue_is_empty());
}

#[test]
fn build_once_runs_queued_batch_before_exiting() {
    let graph = linear_chain(&["clean", "build"]);
    let mut core = CoreRuntime::new(once());

    core.step(request(&["clean"]));
    core.step(request(&["build"]));

    let step = core.step(RuntimeEvent::RunFinished(finished_run(&graph, &["clean"], &[])));
    assert!(step.keep_running);
    assert_eq!(start_targets(&step.commands), Some(targets(&["build"])));

    let step = core.step(RuntimeEvent::RunFinished(finished_run(&graph, &["build"], &[])));
    assert!(!step.keep_running);
    assert_eq!(exit_status(&step.commands), Some(ExitStatus::Success));
}

#[test]
fn watch_mode_notifies_and_keeps_running_after_failure() {
    let graph = linear_chain(&["styles"]);
    let mut core = CoreRuntime::new(watch());

    core.step(request(&["styles"]));
    let step = core.step(RuntimeEvent::RunFinished(finished_run(&graph, &["styles"], &["styles"])));

    assert!(step.keep_running);
    assert!(step.commands.iter().any(|c| matches!(c, CoreCommand::Notify(_))));
    assert_eq!(exit_status(&step.commands), None);
    assert!(core.is_idle());
}

#[test]
fn empty_requests_are_ignored() {
    let mut core = CoreRuntime::new(watch());
    let step = core.step(request(&[]));
    assert!(step.commands.is_empty());
    assert!(core.is_idle());
}

#[test]
fn rejected_run_fails_build_once() {
    let mut core = CoreRuntime::new(once());
    core.step(request(&["missing"]));
    let step = core.step(RuntimeEvent::RunRejected {
        targets: targets(&["missing"]),
        error: ConfigError::UnknownTarget("missing".to_string()),
    });
    assert!(!step.keep_running);
    assert_eq!(exit_status(&step.commands), Some(ExitStatus::Failure));
}

#[test]
fn shutdown_status_depends_on_mode() {
    let mut watching = CoreRuntime::new(watch());
    watching.step(request(&["a"]));
    let step = watching.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert_eq!(exit_status(&step.commands), Some(ExitStatus::Success));

    let mut building = CoreRuntime::new(once());
    building.step(request(&["a"]));
    let step = building.step(RuntimeEvent::ShutdownRequested);
    assert_eq!(exit_status(&step.commands), Some(ExitStatus::Failure));
}

#[test]
fn watcher_failure_stops_the_runtime() {
    let mut core = CoreRuntime::new(watch());
    let step = core.step(RuntimeEvent::WatchFailed {
        error: "inotify limit reached".to_string(),
    });
    assert!(!step.keep_running);
    assert_eq!(exit_status(&step.commands), Some(ExitStatus::Failure));
}

// ---- async runtime -------------------------------------------------------

struct Setup {
    fake: FakeExecutor,
    tx: mpsc::Sender<RuntimeEvent>,
    runtime: Runtime,
}

fn setup(graph: Arc<BuildGraph>, options: RuntimeOptions, fake: FakeExecutor) -> Setup {
    init_tracing();
    let scheduler = Arc::new(Scheduler::new(graph, Arc::new(fake.clone()), 4));
    let (tx, rx) = mpsc::channel(64);
    let runtime = Runtime::new(CoreRuntime::new(options), tx.clone(), rx, scheduler);
    Setup { fake, tx, runtime }
}

#[tokio::test]
async fn build_once_succeeds_for_a_clean_chain() {
    let s = setup(linear_chain(&["clean", "compile", "minify"]), once(), FakeExecutor::new());

    s.tx.send(request(&["minify"])).await.unwrap();
    let status = with_timeout(s.runtime.run()).await;

    assert_eq!(status, ExitStatus::Success);
    assert_eq!(s.fake.executed(), vec!["clean", "compile", "minify"]);
}

#[tokio::test]
async fn build_once_fails_when_a_task_fails() {
    let fake = FakeExecutor::new();
    fake.fail("compile");
    let s = setup(linear_chain(&["clean", "compile", "minify"]), once(), fake);

    s.tx.send(request(&["minify"])).await.unwrap();
    let status = with_timeout(s.runtime.run()).await;

    assert_eq!(status, ExitStatus::Failure);
    assert_eq!(status.code(), 1);
    assert_eq!(s.fake.executed(), vec!["clean", "compile"]);
}

#[tokio::test]
async fn build_once_with_unknown_target_fails() {
    let s = setup(linear_chain(&["a"]), once(), FakeExecutor::new());

    s.tx.send(request(&["nope"])).await.unwrap();
    let status = with_timeout(s.runtime.run()).await;

    assert_eq!(status, ExitStatus::Failure);
    assert!(s.fake.executed().is_empty());
}

#[tokio::test]
async fn clean_runs_as_its_own_run_before_the_build() {
    let graph = graph_of(vec![
        group("clean", &[]),
        group("styles", &[]),
        group("scripts", &[]),
        group("build", &["styles", "scripts"]),
    ]);
    let fake = FakeExecutor::new().with_delay(Duration::from_millis(20));
    let s = setup(graph, once(), fake);

    s.tx.send(request(&["clean"])).await.unwrap();
    s.tx.send(request(&["build"])).await.unwrap();
    let status = with_timeout(s.runtime.run()).await;

    assert_eq!(status, ExitStatus::Success);
    let finished = s.fake.finished();
    assert_eq!(finished.first().map(String::as_str), Some("clean"));
    assert_eq!(finished.len(), 4);
    // `clean` finished before anything else started.
    assert_eq!(s.fake.executed().first().map(String::as_str), Some("clean"));
}

#[tokio::test(start_paused = true)]
async fn changes_during_a_run_coalesce_into_one_follow_up_run() {
    let graph = graph_of(vec![group("a", &[]), group("b", &[]), group("c", &[])]);
    let fake = FakeExecutor::new().with_delay(Duration::from_millis(100));
    let s = setup(graph, once(), fake);

    s.tx.send(request(&["a"])).await.unwrap();
    s.tx.send(request(&["b"])).await.unwrap();
    s.tx.send(request(&["c"])).await.unwrap();
    let status = s.runtime.run().await;

    assert_eq!(status, ExitStatus::Success);
    assert_eq!(s.fake.executed().first().map(String::as_str), Some("a"));
    assert_eq!(s.fake.executed().len(), 3);
    // `b` and `c` ran together in the second run.
    assert_eq!(s.fake.max_in_flight(), 2);
}

// ---- watch mode, end to end ---------------------------------------------

const WINDOW: Duration = Duration::from_millis(200);

fn site() -> Arc<BuildGraph> {
    graph_of(vec![
        Task::new("styles", TaskAction::Styles(StyleOptions::default()))
            .with_inputs(["app/sass/**/*.scss"])
            .with_output(".tmp/styles"),
        Task::new("scripts", TaskAction::Scripts(ScriptOptions::default()))
            .with_inputs(["app/js/**/*.js"])
            .with_output(".tmp/scripts"),
    ])
}

struct Watching {
    fake: FakeExecutor,
    client: Arc<RecordingClient>,
    changes: mpsc::UnboundedSender<ChangeEvent>,
    tx: mpsc::Sender<RuntimeEvent>,
    handle: tokio::task::JoinHandle<ExitStatus>,
}

fn start_watching() -> Watching {
    let graph = site();
    let all = graph.closure(graph.task_names()).unwrap();
    watch_tasks(graph, &all)
}

/// Watch `tasks` of `graph` through the debouncer into a live runtime.
fn watch_tasks(graph: Arc<BuildGraph>, tasks: &BTreeSet<String>) -> Watching {
    init_tracing();
    let fake = FakeExecutor::new();
    fake.set_outputs("styles", &[".tmp/styles/screen.css"]);
    fake.set_outputs("scripts", &[".tmp/scripts/main.js"]);

    let scheduler = Arc::new(Scheduler::new(Arc::clone(&graph), Arc::new(fake.clone()), 4));
    let notifier = Arc::new(ReloadNotifier::new(vec![PathBuf::from(".tmp")]));
    let client = Arc::new(RecordingClient::new());
    notifier.connect(client.clone());

    let (tx, rx) = mpsc::channel(64);
    let runtime = Runtime::new(CoreRuntime::new(watch()), tx.clone(), rx, scheduler)
        .with_notifier(notifier);

    let subscriptions = WatchSubscriptions::from_graph(&graph, tasks).unwrap();
    let (changes, change_rx) = mpsc::unbounded_channel();
    Debouncer::new("/project", subscriptions, WINDOW).spawn(change_rx, tx.clone());

    Watching {
        fake,
        client,
        changes,
        tx,
        handle: tokio::spawn(runtime.run()),
    }
}

fn touch(rel: &str) -> ChangeEvent {
    ChangeEvent::new(PathBuf::from("/project").join(rel), ChangeKind::Modified)
}

#[tokio::test]
async fn style_edit_burst_rebuilds_once_and_injects_styles() {
    let w = start_watching();

    w.changes.send(touch("app/sass/screen.scss")).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    w.changes.send(touch("app/sass/screen.scss")).unwrap();

    let messages = w.client.wait_for(1).await;
    assert_eq!(
        messages,
        vec![ReloadMessage::InjectStyle {
            paths: vec!["/styles/screen.css".to_string()],
        }]
    );

    // Nothing else arrives after the window has long passed.
    tokio::time::sleep(WINDOW * 3).await;
    assert_eq!(w.client.raw().len(), 1);
    assert_eq!(w.fake.executed(), vec!["styles"]);

    w.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    let status = with_timeout(w.handle).await.unwrap();
    assert_eq!(status, ExitStatus::Success);
}

#[tokio::test]
async fn script_edit_rebuilds_scripts_only_and_reloads() {
    let w = start_watching();

    w.changes.send(touch("app/js/app.js")).unwrap();

    let messages = w.client.wait_for(1).await;
    assert_eq!(messages, vec![ReloadMessage::Reload]);
    assert_eq!(w.fake.executed(), vec!["scripts"]);
    assert_eq!(w.fake.execution_count("styles"), 0);

    w.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(w.handle).await.unwrap();
}

#[tokio::test]
async fn failed_rebuild_keeps_watching_and_recovers() {
    let w = start_watching();
    w.fake.fail("styles");

    w.changes.send(touch("app/sass/screen.scss")).unwrap();
    tokio::time::sleep(WINDOW * 3).await;
    assert_eq!(w.fake.execution_count("styles"), 1);
    assert!(w.client.raw().is_empty());
    assert!(!w.handle.is_finished());

    w.fake.recover("styles");
    w.changes.send(touch("app/sass/screen.scss")).unwrap();
    let messages = w.client.wait_for(1).await;
    assert!(matches!(messages[0], ReloadMessage::InjectStyle { .. }));

    w.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(w.handle).await.unwrap();
}

#[tokio::test]
async fn default_serve_pipeline_reloads_for_page_edits() {
    let cfg = parse_and_validate(DEFAULT_PIPELINE).unwrap();
    let watched = cfg.graph().closure(cfg.serve_targets()).unwrap();
    let w = watch_tasks(Arc::clone(cfg.graph()), &watched);

    w.changes.send(touch("app/assets/index.html")).unwrap();

    let messages = w.client.wait_for(1).await;
    assert_eq!(messages, vec![ReloadMessage::Reload]);
    assert_eq!(w.fake.executed(), vec!["pages"]);

    w.changes.send(touch("app/assets/images/logo.png")).unwrap();
    let messages = w.client.wait_for(2).await;
    assert_eq!(messages[1], ReloadMessage::Reload);

    w.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(w.handle).await.unwrap();
}
