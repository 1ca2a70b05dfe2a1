//! Queue module: the host side of the task queue.
//!
//! The chain only needs [`TaskQueue`](crate::ports::TaskQueue). A host also
//! has to hand due tasks to workers and take their outcomes back; that is
//! [`TaskSource`] / [`TaskLease`]. [`InMemoryQueue`] implements both.

mod memory;
mod record;
mod retry;
mod state;

pub use memory::{DEFAULT_HISTORY_LIMIT, InMemoryQueue, ScheduleEntry};
pub use record::TaskRecord;
pub use retry::RetryPolicy;
pub use state::TaskState;

use async_trait::async_trait;

use crate::domain::{AttemptId, Completion, TaskEnvelope, TaskOutcome};
use crate::observability::QueueCounts;
use crate::ports::QueueError;

/// A leased task for processing.
/// The worker owns this lease and must `complete` it with the task's outcome.
#[async_trait]
pub trait TaskLease: Send {
    fn envelope(&self) -> &TaskEnvelope;

    /// 1-indexed attempt number of this execution.
    fn attempt(&self) -> u32;

    /// Unique per lease; correlates the logs of one attempt.
    fn attempt_id(&self) -> AttemptId;

    /// Report the outcome. The queue decides what a `Retry` turns into.
    async fn complete(self: Box<Self>, outcome: TaskOutcome) -> Result<Completion, QueueError>;
}

/// Host side of the queue: hands due tasks to workers.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Lease one due task (waits until available, or returns None once closed).
    async fn lease(&self) -> Option<Box<dyn TaskLease>>;

    async fn counts_by_state(&self) -> Result<QueueCounts, QueueError>;
}
