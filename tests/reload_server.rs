// tests/reload_server.rs

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use assetpipe::reload::http::{
    CLIENT_SCRIPT_TAG, client_script, inject_client_script, spawn_server,
};
use assetpipe::reload::server::{bind, spawn_accept_loop};
use assetpipe::reload::{ReloadMessage, ReloadNotifier};
use assetpipe_test_utils::{init_tracing, with_timeout};

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn http_server_falls_through_roots_in_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let tmp = dir.path().join(".tmp");
    let app = dir.path().join("app");
    fs::create_dir_all(tmp.join("styles")).unwrap();
    fs::create_dir_all(&app).unwrap();
    fs::write(tmp.join("styles/screen.css"), "compiled").unwrap();
    fs::write(app.join("index.html"), "<html><body><p>hi</p></body></html>").unwrap();
    fs::write(app.join("shadowed.txt"), "from app").unwrap();
    fs::write(tmp.join("shadowed.txt"), "from tmp").unwrap();

    let (addr, server) = spawn_server(vec![tmp, app], BTreeMap::new(), 0, 35729)
        .await
        .unwrap();

    let css = with_timeout(get(addr, "/styles/screen.css")).await;
    assert!(css.starts_with("HTTP/1.1 200"), "{css}");
    assert!(css.ends_with("compiled"));

    let page = with_timeout(get(addr, "/index.html")).await;
    assert!(page.starts_with("HTTP/1.1 200"), "{page}");
    assert!(
        page.ends_with(r#"<p>hi</p><script src="/livereload.js"></script></body></html>"#),
        "{page}"
    );

    let shadowed = with_timeout(get(addr, "/shadowed.txt")).await;
    assert!(shadowed.ends_with("from tmp"));

    let missing = with_timeout(get(addr, "/nope.js")).await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

    let script = with_timeout(get(addr, "/livereload.js")).await;
    assert!(script.contains("application/javascript"));
    assert!(script.contains(":35729"));

    server.abort();
}

#[tokio::test]
async fn mounts_serve_under_their_prefix_without_exposing_the_project() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path();
    let bower = project.join("bower_components/jquery/dist");
    fs::create_dir_all(&bower).unwrap();
    fs::create_dir_all(project.join(".tmp")).unwrap();
    fs::write(bower.join("jquery.js"), "window.jQuery = {};").unwrap();
    fs::write(project.join("Assetpipe.toml"), "[task.x]").unwrap();

    let mounts = BTreeMap::from([(
        "/bower_components".to_string(),
        project.join("bower_components"),
    )]);
    let (addr, server) = spawn_server(vec![project.join(".tmp")], mounts, 0, 35729)
        .await
        .unwrap();

    let vendor = with_timeout(get(addr, "/bower_components/jquery/dist/jquery.js")).await;
    assert!(vendor.starts_with("HTTP/1.1 200"), "{vendor}");
    assert!(vendor.ends_with("window.jQuery = {};"));

    let config = with_timeout(get(addr, "/Assetpipe.toml")).await;
    assert!(config.starts_with("HTTP/1.1 404"), "{config}");

    server.abort();
}

#[test]
fn client_script_tag_goes_before_the_last_closing_body() {
    assert_eq!(
        inject_client_script("<html><BODY>x</BODY></html>"),
        format!("<html><BODY>x{CLIENT_SCRIPT_TAG}</BODY></html>")
    );
    assert_eq!(
        inject_client_script("<p>fragment</p>"),
        format!("<p>fragment</p>{CLIENT_SCRIPT_TAG}")
    );
}

#[test]
fn client_script_handles_both_commands() {
    let script = client_script(4000);
    assert!(script.contains(":4000"));
    assert!(script.contains("inject-style"));
    assert!(script.contains("window.location.reload()"));
}

fn wait_for_clients(notifier: &ReloadNotifier, expected: usize) {
    for _ in 0..500 {
        if notifier.client_count() == expected {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(notifier.client_count(), expected);
}

fn listen() -> (Arc<ReloadNotifier>, u16) {
    let notifier = Arc::new(ReloadNotifier::default());
    let (listener, port) = bind(0).unwrap();
    let _accept = spawn_accept_loop(listener, Arc::clone(&notifier));
    (notifier, port)
}

#[test]
fn websocket_clients_receive_broadcasts() {
    init_tracing();
    let (notifier, port) = listen();

    let (mut socket, _) = tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
    wait_for_clients(&notifier, 1);

    let report = notifier.broadcast(ReloadMessage::Reload);
    assert_eq!(report.delivered, 1);

    let message = socket.read().unwrap();
    assert_eq!(message.into_text().unwrap().as_str(), r#"{"command":"reload"}"#);
}

#[test]
fn silent_connection_does_not_block_other_clients() {
    init_tracing();
    let (notifier, port) = listen();

    // Connects but never sends a handshake.
    let mut silent = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
    silent.write_all(b"GET / HTTP/1.1\r\n").unwrap();

    let (_socket, _) = tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
    wait_for_clients(&notifier, 1);
}

#[test]
fn client_sending_close_is_unregistered() {
    init_tracing();
    let (notifier, port) = listen();

    let (mut socket, _) = tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
    wait_for_clients(&notifier, 1);

    socket.close(None).unwrap();
    // Drain until the server's close reply ends the session.
    while socket.read().is_ok() {}

    wait_for_clients(&notifier, 0);
}

#[test]
fn vanished_client_is_unregistered_without_a_broadcast() {
    init_tracing();
    let (notifier, port) = listen();

    let (socket, _) = tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
    wait_for_clients(&notifier, 1);

    drop(socket);

    wait_for_clients(&notifier, 0);
}
