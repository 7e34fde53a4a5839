//! Fetch task execution: lifecycle, worker pipeline and delivery.
//!
//! Split into focused submodules:
//! - [`fetch_task`] - The task, its builder and `execute()`
//! - [`state`] - Monotonic state cell, cancellation and the caller-facing handle
//! - [`handler`] - Consumer contract (`on_result` / `on_error`)
//! - [`worker`] - Round trip, status check and decode on the pool, then delivery

mod fetch_task;
mod handler;
mod state;
mod worker;


pub use fetch_task::FetchTask;
pub use handler::{Callbacks, FetchHandler, callbacks};
pub use state::FetchHandle;
