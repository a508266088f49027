// src/reload/protocol.rs

use serde::{Deserialize, Serialize};

/// Message pushed to every connected live-reload client.
///
/// Encoded as a JSON text frame:
/// `{"command":"reload"}` or
/// `{"command":"inject-style","paths":["/styles/screen.css"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ReloadMessage {
    /// Full page reload.
    Reload,
    /// Swap the listed stylesheets in place without reloading the page.
    InjectStyle { paths: Vec<String> },
}

impl ReloadMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
