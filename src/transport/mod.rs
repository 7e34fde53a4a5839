//! HTTP transport capability
//!
//! Tasks never talk to an HTTP client directly. They go through the
//! [`Transport`] trait, which performs one GET and returns the status, the
//! reason phrase and the fully buffered body.
//!
//! ## Architecture
//!
//! - [`Transport`]: the capability consumed by [`crate::FetchTask`]
//! - [`HttpTransport`]: reqwest-backed implementation, shareable across
//!   workers; [`HttpTransport::shared`] returns the lazily built process-wide
//!   instance
//!
//! ## Usage
//!
//! ```no_run
//! use fetch_task::transport::{HttpTransport, Transport, TransportRequest};
//! use fetch_task::{FetchConfig, TrafficTag};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default();
//! let transport = HttpTransport::new(&config)?;
//! let url = url::Url::parse("http://example.test/v1/gifs/recent")?;
//!
//! let response = transport
//!     .get(TransportRequest::new(&url, &config, TrafficTag(0xBBBB)))
//!     .await?;
//! println!("{} {} ({} bytes)", response.status, response.reason, response.body.len());
//! # Ok(())
//! # }
//! ```

mod http;
mod traits;

pub use http::HttpTransport;
pub use traits::{
    Transport, TransportError, TransportErrorKind, TransportRequest, TransportResponse,
};
