//! Consumer contract for task outcomes

use tokio::sync::oneshot;

use crate::error::FetchError;
use crate::types::Outcome;

/// Receives the single terminal outcome of a task
///
/// Exactly one of the two methods is called, at most once, on the runtime
/// that called [`crate::FetchTask::execute`]. Neither is called if the task
/// is cancelled first. Taking `self: Box<Self>` lets a handler consume
/// owned state such as a channel sender.
pub trait FetchHandler<R>: Send + 'static {
    /// The request succeeded and the body decoded into `result`
    fn on_result(self: Box<Self>, result: R);

    /// The task failed; `error` says where
    fn on_error(self: Box<Self>, error: FetchError);
}

/// A [`FetchHandler`] made of two closures
///
/// Built with [`callbacks`].
pub struct Callbacks<F, G> {
    on_result: F,
    on_error: G,
}

/// Compose a handler from a success closure and a failure closure
///
/// ```
/// use fetch_task::{FetchError, callbacks};
///
/// let handler = callbacks(
///     |body: String| println!("got {} bytes", body.len()),
///     |error: FetchError| eprintln!("fetch failed: {}", error),
/// );
/// # let _ = handler;
/// ```
pub fn callbacks<R, F, G>(on_result: F, on_error: G) -> Callbacks<F, G>
where
    F: FnOnce(R) + Send + 'static,
    G: FnOnce(FetchError) + Send + 'static,
{
    Callbacks {
        on_result,
        on_error,
    }
}

impl<R, F, G> FetchHandler<R> for Callbacks<F, G>
where
    F: FnOnce(R) + Send + 'static,
    G: FnOnce(FetchError) + Send + 'static,
{
    fn on_result(self: Box<Self>, result: R) {
        let Callbacks { on_result, .. } = *self;
        on_result(result)
    }

    fn on_error(self: Box<Self>, error: FetchError) {
        let Callbacks { on_error, .. } = *self;
        on_error(error)
    }
}

impl<F, G> std::fmt::Debug for Callbacks<F, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

/// Forwards the outcome into a oneshot channel
///
/// A dropped receiver is not an error; the outcome is discarded.
impl<R: Send + 'static> FetchHandler<R> for oneshot::Sender<Outcome<R>> {
    fn on_result(self: Box<Self>, result: R) {
        let _ = (*self).send(Outcome::Value(result));
    }

    fn on_error(self: Box<Self>, error: FetchError) {
        let _ = (*self).send(Outcome::Error(error));
    }
}
