use thiserror::Error;

use crate::ports::QueueError;

/// Failure reported by an opaque boundary (environment oracle or sync engine).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BoundaryError(String);

impl BoundaryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Everything that can go wrong while running one link of the chain.
///
/// Task executions never surface these to the host queue; every variant
/// collapses into `TaskOutcome::Retry`. They exist for logs and tests.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("environment oracle failed: {0}")]
    Oracle(#[source] BoundaryError),

    #[error("sync engine failed: {0}")]
    Engine(#[source] BoundaryError),

    #[error("scheduling failed: {0}")]
    Scheduling(#[from] QueueError),

    #[error("guarded call did not complete: {0}")]
    LockAcquisition(String),

    #[error("unknown trigger: {0}")]
    UnknownTrigger(String),
}
