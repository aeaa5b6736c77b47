//! Remote task lifecycle
//!
//! Submit a job, then poll it until it settles:
//! - `TaskSubmitter`: creates exactly one remote task per call
//! - `TaskResultPoller`: single-shot or backoff-driven polling
//! - `TaskState`: lifecycle with terminal-state enforcement
//! - `BackoffPolicy` / `Cancellation`: bounds on the poll loop

pub mod backoff;
pub mod cancel;
pub mod handle;
pub mod poller;
pub mod state;
pub mod submitter;

// Re-export commonly used types
pub use backoff::BackoffPolicy;
pub use cancel::{CancelHandle, Cancellation};
pub use handle::{TaskHandle, TaskPayload, TaskResult};
pub use poller::{result_path, TaskResultPoller};
pub use state::TaskState;
pub use submitter::TaskSubmitter;
