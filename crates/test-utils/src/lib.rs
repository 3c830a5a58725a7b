//! Shared helpers for `rundag` integration tests.
//!
//! - [`builders`]: descriptors and manifest TOML
//! - [`fake_task`]: scripted tasks plus a [`fake_task::Recorder`] recording what ran

pub mod builders;
pub mod fake_task;

use std::future::Future;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Upper bound for any single async test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Capture engine logs in test output.
///
/// Filter from `RUST_LOG`, default `rundag=debug`. Output is only shown for
/// failing tests (or with `--nocapture`). Safe to call from every test: only
/// the first call installs a subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rundag=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test did not finish within {TEST_TIMEOUT:?}"),
    }
}
