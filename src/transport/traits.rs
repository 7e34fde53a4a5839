//! Traits and types for the HTTP transport capability

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{ErrorKind, FetchError};
use crate::traffic::TrafficTag;

/// One GET request as seen by a transport
#[derive(Debug, Clone, Copy)]
pub struct TransportRequest<'a> {
    /// Target URL (already validated)
    pub url: &'a Url,
    /// Time allowed to establish the connection
    pub connect_timeout: Duration,
    /// Time allowed between reads once connected
    pub read_timeout: Duration,
    /// Diagnostic tag for traffic accounting
    pub traffic_tag: TrafficTag,
}

impl<'a> TransportRequest<'a> {
    /// Build a request using the timeouts from `config`
    pub fn new(url: &'a Url, config: &FetchConfig, traffic_tag: TrafficTag) -> Self {
        Self {
            url,
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            traffic_tag,
        }
    }
}

/// A completed HTTP exchange with the body fully buffered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Numeric status code
    pub status: u16,
    /// Reason phrase for the status (may be empty)
    pub reason: String,
    /// Entire response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where in the exchange a transport failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established or timed out while connecting
    Connect,
    /// The connection was reset or the client failed at protocol level
    Protocol,
    /// No data arrived within the read timeout
    ReadTimeout,
    /// Any other I/O fault while reading
    Io,
}

/// Failure reported by a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Where the exchange failed
    pub kind: TransportErrorKind,
    /// Human-readable description
    pub message: String,
}

impl TransportError {
    /// Create a new transport error
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(e: TransportError) -> Self {
        let kind = match e.kind {
            TransportErrorKind::Connect | TransportErrorKind::Protocol => {
                ErrorKind::TransportFailure
            }
            TransportErrorKind::ReadTimeout | TransportErrorKind::Io => ErrorKind::IoFailure,
        };
        FetchError::new(kind, e.message)
    }
}

/// Capability to perform one HTTP GET
///
/// Implementations must be safe to use from many workers at once. A task
/// may drop the returned future at any await point when it is cancelled;
/// implementations should treat that as an interrupted request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET and buffer the whole response body
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no complete response could be read.
    /// A non-2xx status is not an error at this level.
    async fn get(
        &self,
        request: TransportRequest<'_>,
    ) -> std::result::Result<TransportResponse, TransportError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
