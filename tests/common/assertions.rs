//! Custom test assertions for fetch outcomes

use std::time::Duration;
use fetch_task::{ErrorKind, FetchError, Outcome};
use tokio::sync::oneshot;

/// How long a test waits for a callback before giving up
pub const OUTCOME_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait for the outcome delivered into `rx`
///
/// Panics if nothing arrives within [`OUTCOME_TIMEOUT`] or if the task
/// dropped its handler without a callback.
pub async fn recv_outcome<R>(rx: oneshot::Receiver<Outcome<R>>) -> Outcome<R> {
    match tokio::time::timeout(OUTCOME_TIMEOUT, rx).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => panic!("task finished without a callback"),
        Err(_) => panic!("no callback within {:?}", OUTCOME_TIMEOUT),
    }
}

/// Wait for an outcome and require it to be an error of `kind`
pub async fn expect_error_kind<R: std::fmt::Debug>(
    rx: oneshot::Receiver<Outcome<R>>,
    kind: ErrorKind,
) -> FetchError {
    match recv_outcome(rx).await {
        Outcome::Error(error) => {
            assert_eq!(error.kind(), kind, "unexpected error: {}", error);
            error
        }
        Outcome::Value(value) => panic!("expected {} error, got value {:?}", kind, value),
    }
}

/// Wait for an outcome and require it to be a value
pub async fn expect_value<R>(rx: oneshot::Receiver<Outcome<R>>) -> R {
    match recv_outcome(rx).await {
        Outcome::Value(value) => value,
        Outcome::Error(error) => panic!("expected a value, got error: {}", error),
    }
}

/// Assert that no callback arrives within `wait`
pub async fn assert_no_callback<R: std::fmt::Debug>(
    rx: oneshot::Receiver<Outcome<R>>,
    wait: Duration,
) {
    match tokio::time::timeout(wait, rx).await {
        Ok(Ok(outcome)) => panic!("unexpected callback: {:?}", outcome),
        Ok(Err(_)) | Err(_) => {}
    }
}
