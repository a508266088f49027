// src/reload/http.rs

//! Static development server over the serve roots.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, any, get, get_service};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Browser script that listens for live-reload messages.
pub fn client_script(livereload_port: u16) -> String {
    format!(
        r#"(function () {{
  const socket = new WebSocket("ws://" + location.hostname + ":{livereload_port}");
  socket.addEventListener("message", (event) => {{
    const message = JSON.parse(event.data);
    if (message.command === "inject-style") {{
      const links = document.querySelectorAll('link[rel="stylesheet"]');
      for (const path of message.paths) {{
        for (const link of links) {{
          const url = new URL(link.href);
          if (url.pathname === path) {{
            url.searchParams.set("livereload", Date.now());
            link.href = url.toString();
          }}
        }}
      }}
    }} else {{
      window.location.reload();
    }}
  }});
}})();
"#
    )
}

/// Tag that loads [`client_script`] into served pages.
pub const CLIENT_SCRIPT_TAG: &str = r#"<script src="/livereload.js"></script>"#;

/// Insert [`CLIENT_SCRIPT_TAG`] before the closing `</body>`, or append it
/// when the page has none.
pub fn inject_client_script(html: &str) -> String {
    let at = html
        .to_ascii_lowercase()
        .rfind("</body>")
        .unwrap_or(html.len());
    let mut out = String::with_capacity(html.len() + CLIENT_SCRIPT_TAG.len());
    out.push_str(&html[..at]);
    out.push_str(CLIENT_SCRIPT_TAG);
    out.push_str(&html[at..]);
    out
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"))
}

async fn inject_into_html(response: Response) -> Response {
    if response.status() != StatusCode::OK || !is_html(&response) {
        return response;
    }
    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to read HTML response");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to read page").into_response();
        }
    };
    let Ok(html) = std::str::from_utf8(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(inject_client_script(html)))
}

/// Serve from the first root that has the file, then the next, and so on.
fn chain(roots: &[PathBuf]) -> MethodRouter {
    match roots.split_first() {
        Some((first, rest)) => get_service(ServeDir::new(first).fallback(chain(rest))),
        None => any(|| async { StatusCode::NOT_FOUND }),
    }
}

/// Routes: the client script, each mount under its prefix, then the roots.
///
/// HTML pages get [`CLIENT_SCRIPT_TAG`] injected on the way out.
pub fn router(
    roots: &[PathBuf],
    mounts: &BTreeMap<String, PathBuf>,
    livereload_port: u16,
) -> Router {
    let script = client_script(livereload_port);
    let mut app = Router::new().route(
        "/livereload.js",
        get(move || {
            let script = script.clone();
            async move { ([(CONTENT_TYPE, "application/javascript")], script) }
        }),
    );
    for (prefix, dir) in mounts {
        app = app.nest_service(prefix, ServeDir::new(dir));
    }
    app.fallback_service(chain(roots))
        .layer(map_response(inject_into_html))
}

/// Bind `port` (or an ephemeral port when taken) and serve in the background.
pub async fn spawn_server(
    roots: Vec<PathBuf>,
    mounts: BTreeMap<String, PathBuf>,
    port: u16,
    livereload_port: u16,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            warn!(port, error = %err, "HTTP port unavailable; using an ephemeral port");
            tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?
        }
    };
    let addr = listener.local_addr()?;
    let app = router(&roots, &mounts, livereload_port);

    info!(url = %format!("http://{addr}/"), ?roots, ?mounts, "starting HTTP server");
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "HTTP server stopped");
        }
    });

    Ok((addr, handle))
}
