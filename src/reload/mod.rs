// src/reload/mod.rs

//! Live reload: deciding what a finished build means for the browser and
//! pushing it to connected clients.
//!
//! - [`decision`] maps a `BuildRun` to reload / inject-style / nothing.
//! - [`notifier`] owns the client table and broadcasts.
//! - [`protocol`] is the JSON wire format.
//! - [`server`] accepts WebSocket clients.
//! - [`http`] serves the built site plus the client script.

pub mod decision;
pub mod http;
pub mod notifier;
pub mod protocol;
pub mod server;

pub use decision::{ReloadDecision, decide};
pub use notifier::{ClientId, ClientSink, NotifyReport, ReloadNotifier};
pub use protocol::ReloadMessage;
