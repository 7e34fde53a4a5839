//! Work done on the pool for one execution, and delivery back to the caller

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use url::Url;

use super::handler::FetchHandler;
use super::state::TaskShared;
use crate::decode::{DecodeStrategy, panic_detail};
use crate::error::FetchError;
use crate::traffic::{self, TrafficTag};
use crate::transport::{Transport, TransportRequest};
use crate::types::Outcome;

/// Everything the worker needs, moved out of the task at `execute()`
pub(crate) struct FetchJob<R> {
    pub(crate) shared: Arc<TaskShared>,
    pub(crate) url: Url,
    pub(crate) decode: DecodeStrategy<R>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) traffic_tag: TrafficTag,
}

impl<R: Send + 'static> FetchJob<R> {
    /// Run the round trip and decode, unless cancelled first
    ///
    /// Returns `None` when cancellation interrupted the request; the fetch
    /// future is dropped at its current await point.
    pub(crate) async fn run(self) -> Option<Outcome<R>> {
        let cancel = self.shared.cancel_token().clone();
        let tag = self.traffic_tag;
        let fetch = AssertUnwindSafe(traffic::tagged(tag, self.fetch())).catch_unwind();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = fetch => Some(match result {
                Ok(result) => result.into(),
                Err(panic) => Outcome::Error(FetchError::io(format!(
                    "unexpected fault: {}",
                    panic_detail(panic.as_ref())
                ))),
            }),
        }
    }

    async fn fetch(&self) -> Result<R, FetchError> {
        let request = TransportRequest {
            url: &self.url,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            traffic_tag: self.traffic_tag,
        };

        let response = self.transport.get(request).await?;
        tracing::debug!(
            status = response.status,
            bytes = response.body.len(),
            transport = self.transport.name(),
            "response received"
        );

        if !response.is_success() {
            return Err(FetchError::http_status(response.status, response.reason));
        }

        self.decode.decode(response.body)
    }
}

/// Hand `outcome` to `handler` on the caller's runtime, or inline without one
///
/// If the caller's runtime has shut down, the spawned delivery is dropped
/// unpolled and runs inline from its drop instead.
pub(crate) fn deliver<R: Send + 'static>(
    shared: Arc<TaskShared>,
    handler: Box<dyn FetchHandler<R>>,
    outcome: Outcome<R>,
    origin: Option<Handle>,
) {
    let delivery = Delivery {
        shared,
        pending: Some((handler, outcome)),
    };
    match origin {
        Some(handle) => {
            handle.spawn(async move { delivery.run() });
        }
        None => delivery.run(),
    }
}

/// An outcome not yet handed to its handler
struct Delivery<R: Send + 'static> {
    shared: Arc<TaskShared>,
    pending: Option<(Box<dyn FetchHandler<R>>, Outcome<R>)>,
}

impl<R: Send + 'static> Delivery<R> {
    fn run(mut self) {
        if let Some((handler, outcome)) = self.pending.take() {
            complete(&self.shared, handler, outcome);
        }
    }
}

impl<R: Send + 'static> Drop for Delivery<R> {
    fn drop(&mut self) {
        if let Some((handler, outcome)) = self.pending.take() {
            tracing::debug!(
                task_id = %self.shared.id(),
                "caller runtime gone, delivering inline"
            );
            complete(&self.shared, handler, outcome);
        }
    }
}

/// Claim the terminal state, then invoke the matching callback
///
/// If the task was cancelled in the meantime the claim fails and the
/// outcome is dropped without a callback.
pub(crate) fn complete<R: Send + 'static>(
    shared: &TaskShared,
    handler: Box<dyn FetchHandler<R>>,
    outcome: Outcome<R>,
) {
    let terminal = outcome.terminal_state();
    if !shared.advance(terminal) {
        tracing::debug!(
            task_id = %shared.id(),
            state = %shared.state(),
            "outcome discarded"
        );
        return;
    }

    let _settle = shared.settle_on_drop();
    match outcome {
        Outcome::Value(value) => {
            tracing::debug!(task_id = %shared.id(), "fetch completed");
            handler.on_result(value);
        }
        Outcome::Error(error) => {
            tracing::warn!(
                task_id = %shared.id(),
                kind = %error.kind(),
                status = ?error.status(),
                error = %error.message(),
                "fetch failed"
            );
            handler.on_error(error);
        }
    }
}
