// src/reload/server.rs

//! WebSocket endpoint for live-reload clients.

use std::io::ErrorKind;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};
use tungstenite::{Message, WebSocket};

use crate::errors::NotifierError;
use crate::reload::notifier::{ClientId, ClientSink, ReloadNotifier};

/// A browser connected over WebSocket.
pub struct WebSocketClient {
    id: Mutex<Option<ClientId>>,
    socket: Mutex<WebSocket<TcpStream>>,
}

impl WebSocketClient {
    pub fn new(socket: WebSocket<TcpStream>) -> Self {
        Self {
            id: Mutex::new(None),
            socket: Mutex::new(socket),
        }
    }
}

impl ClientSink for WebSocketClient {
    fn send(&self, text: &str) -> Result<(), NotifierError> {
        let client = self
            .id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unwrap_or_default();
        self.socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(Message::text(text.to_owned()))
            .map_err(|err| NotifierError::Push {
                client,
                reason: err.to_string(),
            })
    }
}

/// Bind the live-reload listener, falling back to an ephemeral port when
/// `port` is taken.
pub fn bind(port: u16) -> Result<(TcpListener, u16), NotifierError> {
    let listener = match TcpListener::bind(("127.0.0.1", port)) {
        Ok(sock) => sock,
        Err(err) => {
            warn!(port, error = %err, "live-reload port unavailable; using an ephemeral port");
            TcpListener::bind(("127.0.0.1", 0))?
        }
    };
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

/// Accept WebSocket clients on a background thread and register them with
/// `notifier`.
///
/// Each connection gets its own thread: the handshake must finish within
/// [`HANDSHAKE_TIMEOUT`], after which the thread keeps reading so a close
/// frame or a dropped connection unregisters the client.
pub fn spawn_accept_loop(listener: TcpListener, notifier: Arc<ReloadNotifier>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(error = %err, "failed to accept live-reload connection");
                    continue;
                }
            };
            let notifier = notifier.clone();
            let spawned = std::thread::Builder::new()
                .name("livereload-client".into())
                .spawn(move || serve_client(stream, &notifier));
            if let Err(err) = spawned {
                warn!(error = %err, "failed to spawn live-reload client thread");
            }
        }
        info!("live-reload accept loop finished");
    })
}

/// Upper bound for a client to complete the WebSocket handshake.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the reader holds the socket before letting senders in.
const READ_POLL: Duration = Duration::from_millis(100);

fn serve_client(stream: TcpStream, notifier: &ReloadNotifier) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_default();

    let socket = match stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .map_err(|err| NotifierError::Handshake(err.to_string()))
        .and_then(|()| {
            tungstenite::accept(stream).map_err(|err| NotifierError::Handshake(err.to_string()))
        }) {
        Ok(socket) => socket,
        Err(err) => {
            warn!(%peer, error = %err, "rejected live-reload client");
            return;
        }
    };
    if let Err(err) = socket.get_ref().set_read_timeout(Some(READ_POLL)) {
        warn!(%peer, error = %err, "rejected live-reload client");
        return;
    }

    let client = Arc::new(WebSocketClient::new(socket));
    let id = notifier.connect(client.clone());
    *client.id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
    debug!(client = id, %peer, "live-reload client connected");

    loop {
        let read = client
            .socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read();
        match read {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(err) => {
                debug!(client = id, error = %err, "live-reload client read failed");
                break;
            }
        }
    }

    // Sends the queued close reply, if any.
    let _ = client
        .socket
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .flush();
    notifier.disconnect(id);
}
