//! Structured-concurrency primitives shared by every spawning component:
//! a cancellation-aware task manager (the `main` scope's finalizer) and the
//! process-wide backoff coordinator consulted before any outbound call.

mod backoff;
mod retry;
mod shutdown;

pub use backoff::BackoffCoordinator;
pub use retry::{jittered_backoff, retry_with_backoff};
pub use shutdown::{wait_for_signal, TaskManager};

pub use tokio_util::sync::CancellationToken;
