//! Outcome model: what one task execution reports back to the host queue.
//!
//! The outcome is about the *attempt*, not the chain. A successful attempt has
//! already scheduled its successor; a retry asks the host queue to run the same
//! attempt again under its own backoff policy.

use serde::{Deserialize, Serialize};

/// Terminal result of a single task execution.
///
/// Serialized as SCREAMING_SNAKE_CASE (SUCCESS / RETRY) to match what a host
/// queue persists for its own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOutcome {
    /// This attempt is done. The chain continues through the task it scheduled.
    Success,

    /// Re-attempt this same execution later. Nothing was scheduled.
    Retry,
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// What the host queue did with a task after it reported its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Completion {
    Succeeded,

    /// The same task will be leased again after `delay_secs`.
    RetryScheduled { attempt: u32, delay_secs: u64 },

    /// Retry budget exhausted. The task will never run again.
    Dead { attempts: u32 },
}
