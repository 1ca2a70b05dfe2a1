//! Task state machine for the in-memory host queue.

use serde::{Deserialize, Serialize};

/// Task state.
///
/// State transitions:
/// - Queued -> Running -> Succeeded
/// - Delayed -> Queued (when `not_before` passes)
/// - Running -> RetryScheduled -> Queued (loop while the retry budget allows)
/// - Running -> Dead (retry budget exhausted)
/// - Queued | Delayed | RetryScheduled -> Cancelled (replaced under a dedup key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Ready to run immediately.
    Queued,

    /// Enqueued with a delay that has not elapsed yet.
    Delayed,

    /// Currently being executed by a worker.
    Running,

    /// Successfully completed.
    Succeeded,

    /// Waiting for retry (delayed due to backoff).
    RetryScheduled,

    /// Failed permanently (retry budget exhausted).
    Dead,

    /// Removed before it ever ran.
    Cancelled,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Dead | TaskState::Cancelled
        )
    }

    /// Is this task runnable (eligible for lease)?
    pub fn is_runnable(self) -> bool {
        matches!(self, TaskState::Queued)
    }

    /// Waiting for its time to come (first run or retry).
    pub fn is_waiting(self) -> bool {
        matches!(self, TaskState::Delayed | TaskState::RetryScheduled)
    }
}
