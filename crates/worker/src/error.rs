//! Worker-level errors.

use crate::lifecycle::LifecycleError;
use thiserror::Error;

/// Errors surfaced by worker event handlers and the runtime.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Core(#[from] umbra_core::Error),

    #[error("INVALID_URL: {0}")]
    Url(#[from] umbra_client::fetch::UrlError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The worker task is gone; no further events can be delivered.
    #[error("worker task terminated")]
    Terminated,
}
