// tests/notifier.rs

use std::path::PathBuf;
use std::sync::Arc;

use assetpipe::adapters::{ScriptOptions, StyleOptions};
use assetpipe::dag::{BuildGraph, BuildRun, Scheduler, Task, TaskAction};
use assetpipe::reload::{ReloadDecision, ReloadMessage, ReloadNotifier, decide};
use assetpipe_test_utils::builders::{graph_of, group};
use assetpipe_test_utils::fake_executor::FakeExecutor;
use assetpipe_test_utils::init_tracing;
use assetpipe_test_utils::recording_client::RecordingClient;

fn pipeline() -> Arc<BuildGraph> {
    graph_of(vec![
        Task::new(
            "clean",
            TaskAction::Clean {
                paths: vec![".tmp".into()],
            },
        ),
        Task::new("styles", TaskAction::Styles(StyleOptions::default()))
            .with_inputs(["app/sass/**/*.scss"])
            .with_output(".tmp/styles"),
        Task::new("scripts", TaskAction::Scripts(ScriptOptions::default()))
            .with_inputs(["app/js/**/*.js"])
            .with_output(".tmp/scripts"),
        group("build", &["styles", "scripts"]),
    ])
}

fn fake() -> FakeExecutor {
    let fake = FakeExecutor::new();
    fake.set_outputs("styles", &[".tmp/styles/screen.css", ".tmp/styles/print.css"]);
    fake.set_outputs("scripts", &[".tmp/scripts/main.js"]);
    fake.set_outputs("clean", &[]);
    fake.set_outputs("build", &[]);
    fake
}

async fn run(graph: &Arc<BuildGraph>, fake: &FakeExecutor, targets: &[&str]) -> BuildRun {
    let scheduler = Scheduler::new(Arc::clone(graph), Arc::new(fake.clone()), 2);
    scheduler.run(targets.iter().copied()).await.unwrap()
}

fn notifier_with(clients: &[Arc<RecordingClient>]) -> ReloadNotifier {
    let notifier = ReloadNotifier::new(vec![PathBuf::from(".tmp")]);
    for client in clients {
        notifier.connect(client.clone());
    }
    notifier
}

#[tokio::test]
async fn style_only_run_injects_styles_into_every_client() {
    init_tracing();
    let graph = pipeline();
    let run = run(&graph, &fake(), &["styles"]).await;

    let clients = [Arc::new(RecordingClient::new()), Arc::new(RecordingClient::new())];
    let notifier = notifier_with(&clients);
    let report = notifier.notify(&run, &graph);

    let expected = ReloadMessage::InjectStyle {
        paths: vec!["/styles/screen.css".to_string(), "/styles/print.css".to_string()],
    };
    assert_eq!(report.delivered, 2);
    assert_eq!(report.message, Some(expected.clone()));
    for client in clients.iter() {
        assert_eq!(client.messages(), vec![expected.clone()]);
    }
}

#[tokio::test]
async fn clean_does_not_turn_a_style_run_into_a_reload() {
    let graph = pipeline();
    let run = run(&graph, &fake(), &["clean", "styles"]).await;

    match decide(&run, &graph) {
        ReloadDecision::InjectStyle(paths) => assert_eq!(paths.len(), 2),
        other => panic!("expected style injection, got {other:?}"),
    }
}

#[tokio::test]
async fn script_changes_trigger_a_full_reload() {
    let graph = pipeline();
    let run = run(&graph, &fake(), &["build"]).await;

    let client = Arc::new(RecordingClient::new());
    let notifier = notifier_with(&[client.clone()]);
    notifier.notify(&run, &graph);

    assert_eq!(client.messages(), vec![ReloadMessage::Reload]);
}

#[tokio::test]
async fn any_failure_sends_nothing() {
    let graph = pipeline();
    let fake = fake();
    fake.fail("scripts");
    let run = run(&graph, &fake, &["build"]).await;

    let client = Arc::new(RecordingClient::new());
    let notifier = notifier_with(&[client.clone()]);
    let report = notifier.notify(&run, &graph);

    assert_eq!(report.message, None);
    assert_eq!(report.delivered, 0);
    assert!(client.raw().is_empty());
}

#[tokio::test]
async fn style_task_without_css_output_falls_back_to_reload() {
    let graph = pipeline();
    let fake = fake();
    fake.set_outputs("styles", &[]);
    let run = run(&graph, &fake, &["styles"]).await;

    assert_eq!(decide(&run, &graph), ReloadDecision::Reload);
}

#[tokio::test]
async fn failing_client_is_dropped_without_affecting_others() {
    let graph = pipeline();
    let run = run(&graph, &fake(), &["build"]).await;

    let notifier = ReloadNotifier::new(vec![PathBuf::from(".tmp")]);
    let healthy = Arc::new(RecordingClient::new());
    let healthy_id = notifier.connect(healthy.clone());
    let broken_id = notifier.connect(Arc::new(RecordingClient::broken()));
    assert_eq!(notifier.client_count(), 2);

    let report = notifier.notify(&run, &graph);

    assert_eq!(report.delivered, 1);
    assert_eq!(report.dropped, vec![broken_id]);
    assert_eq!(notifier.client_count(), 1);
    assert_eq!(healthy.messages(), vec![ReloadMessage::Reload]);

    // The next run reaches the remaining client only.
    notifier.notify(&run, &graph);
    assert_eq!(healthy.messages().len(), 2);
    assert!(notifier.disconnect(healthy_id));
    assert!(!notifier.disconnect(healthy_id));
    assert_eq!(notifier.client_count(), 0);
}

#[test]
fn client_ids_are_unique() {
    let notifier = ReloadNotifier::default();
    let a = notifier.connect(Arc::new(RecordingClient::new()));
    let b = notifier.connect(Arc::new(RecordingClient::new()));
    assert_ne!(a, b);
}

#[test]
fn urls_are_relative_to_the_first_matching_root() {
    let notifier = ReloadNotifier::new(vec![PathBuf::from(".tmp"), PathBuf::from("public")]);
    assert_eq!(
        notifier.url_for(&PathBuf::from(".tmp/styles/screen.css")),
        "/styles/screen.css"
    );
    assert_eq!(notifier.url_for(&PathBuf::from("public/img/a.png")), "/img/a.png");
    assert_eq!(notifier.url_for(&PathBuf::from("other/x.css")), "/other/x.css");
}

#[test]
fn wire_format_is_tagged_json() {
    assert_eq!(ReloadMessage::Reload.to_json().unwrap(), r#"{"command":"reload"}"#);
    let inject = ReloadMessage::InjectStyle {
        paths: vec!["/styles/screen.css".to_string()],
    };
    assert_eq!(
        inject.to_json().unwrap(),
        r#"{"command":"inject-style","paths":["/styles/screen.css"]}"#
    );
}
