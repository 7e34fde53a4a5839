//! # fetch-task
//!
//! Single-shot, cancellable HTTP GET tasks with typed decoding.
//!
//! ## Design Philosophy
//!
//! fetch-task is designed to be:
//! - **Single-shot** - One task, one request, one outcome
//! - **Exactly-once** - Each execution ends in exactly one callback, or none if cancelled
//! - **Typed** - Bodies decode through serde or a custom function into the caller's type
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//!
//! A [`FetchTask`] runs on a bounded [`FetchPool`] and hands its outcome back
//! to the runtime that executed it. Failures are never returned from
//! `execute()`; they arrive as a classified [`FetchError`] through
//! [`FetchHandler::on_error`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use fetch_task::{DecodeStrategy, FetchError, FetchTask, callbacks};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Gif {
//!     id: String,
//! }
//!
//! #[derive(Debug, Deserialize)]
//! struct Translate {
//!     data: Vec<Gif>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = callbacks(
//!         |found: Translate| println!("{} gifs", found.data.len()),
//!         |error: FetchError| eprintln!("lookup failed: {}", error),
//!     );
//!
//!     let mut task = FetchTask::new(
//!         "http://api.giphy.com/v1/gifs/translate?api_key=KEY&s=facepalm",
//!         handler,
//!     )
//!     .with_decode(DecodeStrategy::json())?;
//!
//!     let handle = task.execute()?;
//!     println!("task {} ended as {}", handle.id(), handle.finished().await);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Decode strategies
pub mod decode;
/// Error types
pub mod error;
/// Worker pool
pub mod pool;
/// Fetch task lifecycle and delivery
pub mod task;
/// Traffic tagging and accounting
pub mod traffic;
/// HTTP transport capability
pub mod transport;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::FetchConfig;
pub use decode::{CustomDecode, DecodeFailure, DecodeStrategy, StructuredDecode};
pub use error::{Error, ErrorKind, FetchError, Result};
pub use pool::FetchPool;
pub use task::{Callbacks, FetchHandle, FetchHandler, FetchTask, callbacks};
pub use traffic::{TrafficStats, TrafficTag};
pub use types::{Outcome, RequestKind, TaskId, TaskState};
