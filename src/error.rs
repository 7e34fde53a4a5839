//! Error types for fetch-task
//!
//! Two layers of errors live here:
//! - [`Error`] is returned from the crate's own API when it is misused or
//!   cannot be set up (bad configuration, executing a task twice, building
//!   the HTTP client or worker runtime).
//! - [`FetchError`] is the classified outcome of a failed fetch. It never
//!   surfaces as a `Result` from [`crate::FetchTask::execute`]; it is always
//!   delivered through [`crate::FetchHandler::on_error`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{TaskId, TaskState};

/// Result type alias for fetch-task operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fetch-task
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "read_timeout")
        key: Option<String>,
    },

    /// `execute()` was called on a task that already left the `Created` state
    #[error("task {id} cannot be executed in state {state}")]
    AlreadyExecuted {
        /// The task that was executed twice
        id: TaskId,
        /// The state the task was in when `execute()` was called
        state: TaskState,
    },

    /// A decode strategy was selected on a task that already has one
    #[error("a decode strategy has already been selected for this task")]
    DecodeAlreadySelected,

    /// The shared worker pool was configured after it had been initialized
    #[error("the shared fetch pool is already initialized")]
    PoolAlreadyInitialized,

    /// The worker runtime could not be built
    #[error("failed to build worker runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Classification of a failed fetch
///
/// Every failure path of a task maps onto exactly one of these kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, empty or unparsable URL, or an unsupported request kind
    InvalidInput,
    /// Connection could not be established, was reset, or the client failed at protocol level
    TransportFailure,
    /// Response status outside 2xx
    HttpStatusError,
    /// Body could not be parsed as the expected serialization at all
    DecodeSyntaxError,
    /// Body parsed but did not satisfy the expected shape, or the decoder faulted
    DecodeSemanticError,
    /// Any other I/O fault while reading, including unexpected worker faults
    IoFailure,
}

impl ErrorKind {
    /// Machine-readable code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::HttpStatusError => "http_status",
            ErrorKind::DecodeSyntaxError => "decode_syntax",
            ErrorKind::DecodeSemanticError => "decode_semantic",
            ErrorKind::IoFailure => "io_failure",
        }
    }

    /// Whether this kind comes out of the decode step
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            ErrorKind::DecodeSyntaxError | ErrorKind::DecodeSemanticError
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified fetch failure, delivered through `on_error`
///
/// Immutable once constructed. HTTP status failures also carry the numeric
/// status code; every other kind leaves `status` empty.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct FetchError {
    kind: ErrorKind,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl FetchError {
    /// Create a new error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Create an `InvalidInput` error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Create an `HttpStatusError` carrying the status code and the reason phrase
    pub fn http_status(status: u16, reason: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::HttpStatusError,
            message: reason.into(),
            status: Some(status),
        }
    }

    /// Create a `DecodeSyntaxError`
    pub fn decode_syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeSyntaxError, message)
    }

    /// Create a `DecodeSemanticError`
    pub fn decode_semantic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeSemanticError, message)
    }

    /// Create an `IoFailure`
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IoFailure, message)
    }

    /// The classification of this error
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message
    ///
    /// For `HttpStatusError` this is the reason phrase supplied with the response.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Numeric HTTP status, only set for `HttpStatusError`
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match e.classify() {
            Category::Syntax | Category::Eof => Self::decode_syntax(e.to_string()),
            Category::Data => Self::decode_semantic(e.to_string()),
            Category::Io => Self::io(e.to_string()),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_distinct_code() {
        let kinds = [
            ErrorKind::InvalidInput,
            ErrorKind::TransportFailure,
            ErrorKind::HttpStatusError,
            ErrorKind::DecodeSyntaxError,
            ErrorKind::DecodeSemanticError,
            ErrorKind::IoFailure,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn http_status_error_keeps_status_and_reason() {
        let err = FetchError::http_status(404, "Not Found");
        assert_eq!(err.kind(), ErrorKind::HttpStatusError);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.message(), "Not Found");
        assert_eq!(err.to_string(), "http_status: Not Found");
    }

    #[test]
    fn non_status_errors_have_no_status() {
        assert_eq!(FetchError::invalid_input("URL is empty").status(), None);
        assert_eq!(FetchError::io("reset").status(), None);
    }

    #[test]
    fn serde_json_syntax_errors_classify_as_decode_syntax() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert_eq!(FetchError::from(err).kind(), ErrorKind::DecodeSyntaxError);

        let err = serde_json::from_str::<serde_json::Value>("{\"a\":").unwrap_err();
        assert_eq!(FetchError::from(err).kind(), ErrorKind::DecodeSyntaxError);
    }

    #[test]
    fn serde_json_shape_errors_classify_as_decode_semantic() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Meta {
            status: u16,
        }

        let err = serde_json::from_str::<Meta>(r#"{"status":"ok"}"#).unwrap_err();
        assert_eq!(FetchError::from(err).kind(), ErrorKind::DecodeSemanticError);
    }

    #[test]
    fn fetch_error_serializes_with_snake_case_kind() {
        let err = FetchError::http_status(500, "Internal Server Error");
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["kind"], "http_status_error");
        assert_eq!(v["status"], 500);

        let v = serde_json::to_value(FetchError::io("boom")).unwrap();
        assert!(v.get("status").is_none());
    }

    #[test]
    fn decode_kinds_are_flagged() {
        assert!(ErrorKind::DecodeSyntaxError.is_decode());
        assert!(ErrorKind::DecodeSemanticError.is_decode());
        assert!(!ErrorKind::IoFailure.is_decode());
    }
}
