//! Errors shared between a computing caller and its coalesced waiters.

use std::sync::Arc;
use thiserror::Error;

/// Failure of a shared computation.
///
/// Cloneable so one failure can be handed to every waiter.
#[derive(Error, Debug, Clone)]
pub enum ComputeError {
    #[error("Compute failed: {0:#}")]
    Failed(Arc<anyhow::Error>),

    #[error("Computation for query {0} was abandoned before it published a result")]
    Abandoned(String),
}

impl From<anyhow::Error> for ComputeError {
    fn from(err: anyhow::Error) -> Self {
        ComputeError::Failed(Arc::new(err))
    }
}
