//! Test configuration helpers for building pools and tasks against a mock server

use std::sync::Arc;
use std::time::Duration;
use fetch_task::transport::HttpTransport;
use fetch_task::{FetchConfig, FetchPool};
use tokio::runtime::Handle;

/// Configuration with timeouts short enough for tests
pub fn test_config() -> FetchConfig {
    FetchConfig {
        connect_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_millis(500),
        max_concurrent_fetches: 4,
        ..Default::default()
    }
}

/// A pool bound to the test's own runtime
pub fn local_pool() -> FetchPool {
    FetchPool::from_handle(Handle::current(), test_config().max_concurrent_fetches)
        .expect("pool for test runtime")
}

/// An HTTP transport built from [`test_config`]
pub fn test_transport() -> Arc<HttpTransport> {
    Arc::new(HttpTransport::new(&test_config()).expect("http transport"))
}
