pub mod builders;
pub mod fake_executor;
pub mod recording_client;

pub use builders::{ConfigFileBuilder, TaskConfigBuilder, graph_of, group, linear_chain};
pub use fake_executor::FakeExecutor;
pub use recording_client::RecordingClient;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use assetpipe::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// The filter comes from `ASSETPIPE_LOG` (same syntax as `RUST_LOG`), then
/// `RUST_LOG`, then `info`. Output is captured by the harness and shown only
/// for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test step timed out after {TEST_TIMEOUT:?}"))
}
