//! Configuration types for fetch-task

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::traffic::TrafficTag;

/// Configuration shared by tasks, the HTTP transport and the worker pool
///
/// Every field has a serde default, so an empty JSON object is a valid
/// configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Time allowed to establish a connection (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_ms_serde")]
    pub connect_timeout: Duration,

    /// Time allowed between reads once connected (default: 8 seconds)
    ///
    /// Applied while waiting for the response head and to every body chunk.
    #[serde(default = "default_read_timeout", with = "duration_ms_serde")]
    pub read_timeout: Duration,

    /// Maximum number of fetches in flight at once (default: 2 × CPUs + 1)
    ///
    /// Excess executions wait for a free slot in FIFO order.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Threads of the shared worker runtime (default: number of CPUs)
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// Traffic tag applied to tasks that do not set their own (default: 0xAAAA)
    #[serde(default)]
    pub traffic_tag: TrafficTag,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Follow HTTP redirects (default: true)
    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    /// Maximum redirects followed when `follow_redirects` is set (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            worker_threads: default_worker_threads(),
            traffic_tag: TrafficTag::default(),
            user_agent: default_user_agent(),
            follow_redirects: true,
            max_redirects: default_max_redirects(),
        }
    }
}

impl FetchConfig {
    /// Check that the configuration can drive a pool and a transport
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(config_error("connect_timeout must be positive", "connect_timeout"));
        }
        if self.read_timeout.is_zero() {
            return Err(config_error("read_timeout must be positive", "read_timeout"));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(config_error(
                "max_concurrent_fetches must be at least 1",
                "max_concurrent_fetches",
            ));
        }
        if self.worker_threads == 0 {
            return Err(config_error(
                "worker_threads must be at least 1",
                "worker_threads",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_max_concurrent_fetches() -> usize {
    available_cpus() * 2 + 1
}

fn default_worker_threads() -> usize {
    available_cpus()
}

fn default_user_agent() -> String {
    concat!("fetch-task/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_redirects() -> usize {
    10
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
