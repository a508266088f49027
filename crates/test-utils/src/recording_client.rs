use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use assetpipe::errors::NotifierError;
use assetpipe::reload::{ClientSink, ReloadMessage};

/// Live-reload client that stores every message it receives.
#[derive(Default)]
pub struct RecordingClient {
    messages: Mutex<Vec<String>>,
    broken: AtomicBool,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every push fails, like a closed browser tab.
    pub fn broken() -> Self {
        let client = Self::default();
        client.broken.store(true, Ordering::SeqCst);
        client
    }

    pub fn raw(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<ReloadMessage> {
        self.raw()
            .iter()
            .map(|text| serde_json::from_str(text).expect("valid reload message"))
            .collect()
    }

    /// Poll until at least `n` messages arrived (panics after 5 seconds).
    pub async fn wait_for(&self, n: usize) -> Vec<ReloadMessage> {
        crate::with_timeout(async {
            loop {
                if self.messages.lock().unwrap().len() >= n {
                    return self.messages();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }
}

impl ClientSink for RecordingClient {
    fn send(&self, text: &str) -> Result<(), NotifierError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(NotifierError::Push {
                client: 0,
                reason: "connection closed".to_string(),
            });
        }
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
