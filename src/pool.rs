//! Worker pool that executes fetch tasks
//!
//! A [`FetchPool`] pairs a tokio runtime handle with a FIFO semaphore that
//! caps how many fetches are in flight. The process-wide pool
//! ([`FetchPool::shared`]) owns a work-stealing multi-thread runtime built on
//! first use and kept for the life of the process. Callers that already run
//! inside a runtime can bind a pool to it with [`FetchPool::from_handle`].

use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::FetchConfig;
use crate::error::{Error, Result};

struct SharedPool {
    // Never dropped; the static keeps the worker threads alive.
    runtime: Runtime,
    pool: FetchPool,
}

static SHARED: OnceLock<SharedPool> = OnceLock::new();

/// Bounded executor for fetch work
///
/// Cloning is cheap; clones share the same runtime and concurrency limit.
#[derive(Clone, Debug)]
pub struct FetchPool {
    handle: Handle,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl FetchPool {
    /// Bind a pool to an existing runtime
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `max_concurrent` is zero.
    pub fn from_handle(handle: Handle, max_concurrent: usize) -> Result<Self> {
        if max_concurrent == 0 {
            return Err(Error::Config {
                message: "max_concurrent_fetches must be at least 1".to_string(),
                key: Some("max_concurrent_fetches".to_string()),
            });
        }
        Ok(Self {
            handle,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    /// The process-wide pool, built with `FetchConfig::default()` on first use
    ///
    /// # Errors
    ///
    /// Returns `Error::Runtime` if the worker runtime cannot be started.
    pub fn shared() -> Result<FetchPool> {
        if let Some(shared) = SHARED.get() {
            return Ok(shared.pool.clone());
        }
        let candidate = build_shared(&FetchConfig::default())?;
        match SHARED.set(candidate) {
            Ok(()) => {}
            // Lost the race against another initializer; keep theirs.
            Err(loser) => loser.runtime.shutdown_background(),
        }
        SHARED
            .get()
            .map(|shared| shared.pool.clone())
            .ok_or(Error::PoolAlreadyInitialized)
    }

    /// Configure the process-wide pool before first use
    ///
    /// # Errors
    ///
    /// Returns `Error::PoolAlreadyInitialized` if the shared pool already
    /// exists, `Error::Config` if `config` is invalid, or `Error::Runtime`
    /// if the worker runtime cannot be started.
    pub fn install_shared(config: &FetchConfig) -> Result<FetchPool> {
        if SHARED.get().is_some() {
            return Err(Error::PoolAlreadyInitialized);
        }
        config.validate()?;
        let candidate = build_shared(config)?;
        let pool = candidate.pool.clone();
        match SHARED.set(candidate) {
            Ok(()) => Ok(pool),
            Err(loser) => {
                loser.runtime.shutdown_background();
                Err(Error::PoolAlreadyInitialized)
            }
        }
    }

    /// Maximum number of fetches run at once
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Slots currently free
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Fetches currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.max_concurrent
            .saturating_sub(self.permits.available_permits())
    }

    /// Run `work` once a slot is free
    ///
    /// Waiters are served in FIFO order. If `cancel` fires before a slot
    /// frees up, `work` is dropped without being polled and the join handle
    /// resolves to `None`.
    pub fn spawn<F>(&self, cancel: &CancellationToken, work: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let cancel = cancel.clone();

        self.handle.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                permit = permits.acquire_owned() => permit.ok()?,
            };
            Some(work.await)
        })
    }
}

fn build_shared(config: &FetchConfig) -> Result<SharedPool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name("fetch-worker")
        .enable_all()
        .build()?;

    let pool = FetchPool::from_handle(runtime.handle().clone(), config.max_concurrent_fetches)?;

    tracing::info!(
        worker_threads = config.worker_threads,
        max_concurrent = config.max_concurrent_fetches,
        "shared fetch pool started"
    );

    Ok(SharedPool { runtime, pool })
}
