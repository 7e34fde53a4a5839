//! Diagnostic traffic tagging and accounting
//!
//! A [`TrafficTag`] is an opaque label attached to a task's network traffic.
//! It has no effect on behavior. While a request runs, the tag is applied as
//! a tokio task-local ([`tagged`], [`current_tag`]) and an accounting guard
//! from [`TrafficStats::begin`] counts the request as active. Both are scoped:
//! leaving the future or dropping the guard clears them whether the request
//! succeeded, failed or panicked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Opaque diagnostic label for network accounting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrafficTag(pub u32);

impl Default for TrafficTag {
    fn default() -> Self {
        Self(0xAAAA)
    }
}

impl std::fmt::Display for TrafficTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl From<u32> for TrafficTag {
    fn from(tag: u32) -> Self {
        Self(tag)
    }
}

tokio::task_local! {
    static CURRENT_TAG: TrafficTag;
}

/// Run `fut` with `tag` applied as the current traffic tag
pub async fn tagged<F: Future>(tag: TrafficTag, fut: F) -> F::Output {
    CURRENT_TAG.scope(tag, fut).await
}

/// The traffic tag applied to the running future, if any
pub fn current_tag() -> Option<TrafficTag> {
    CURRENT_TAG.try_with(|tag| *tag).ok()
}

/// Counters kept for one traffic tag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCounters {
    /// Requests started under this tag
    pub requests: u64,
    /// Body bytes received under this tag
    pub bytes_received: u64,
    /// Requests currently in flight under this tag
    pub active: u64,
}

/// Per-tag traffic accounting
#[derive(Debug, Default)]
pub struct TrafficStats {
    counters: Mutex<HashMap<TrafficTag, TrafficCounters>>,
}

impl TrafficStats {
    /// Create an empty, independent accounting table
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide accounting table used by the HTTP transport
    pub fn global() -> &'static TrafficStats {
        static GLOBAL: OnceLock<TrafficStats> = OnceLock::new();
        GLOBAL.get_or_init(TrafficStats::new)
    }

    /// Count a request as started and active until the returned guard drops
    pub fn begin(&self, tag: TrafficTag) -> TrafficGuard<'_> {
        {
            let mut counters = self.lock();
            let entry = counters.entry(tag).or_default();
            entry.requests += 1;
            entry.active += 1;
        }
        TrafficGuard { stats: self, tag }
    }

    /// Counters for `tag` (all zero if the tag was never used)
    pub fn snapshot(&self, tag: TrafficTag) -> TrafficCounters {
        self.lock().get(&tag).copied().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TrafficTag, TrafficCounters>> {
        // Counters stay consistent even if a holder panicked.
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Marks one request as active; clears it on drop
#[must_use = "the request is only counted as active while the guard lives"]
#[derive(Debug)]
pub struct TrafficGuard<'a> {
    stats: &'a TrafficStats,
    tag: TrafficTag,
}

impl TrafficGuard<'_> {
    /// Add received body bytes to the tag's counters
    pub fn record_bytes(&self, bytes: usize) {
        let mut counters = self.stats.lock();
        let entry = counters.entry(self.tag).or_default();
        entry.bytes_received = entry.bytes_received.saturating_add(bytes as u64);
    }
}

impl Drop for TrafficGuard<'_> {
    fn drop(&mut self) {
        let mut counters = self.stats.lock();
        if let Some(entry) = counters.get_mut(&self.tag) {
            entry.active = entry.active.saturating_sub(1);
        }
    }
}
