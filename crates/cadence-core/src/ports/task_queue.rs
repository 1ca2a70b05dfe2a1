//! TaskQueue port - ホスト側の永続・重複排除つき遅延実行キュー
//!
//! The chain only ever *adds* work to the queue. It never inspects queue
//! state; deduplication, persistence and retry re-delivery are the queue's job.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChainJob, DedupKey, DelaySeconds, ExistingPolicy, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// What `enqueue_unique` did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// No instance was pending under the key; a new task was created.
    Enqueued(TaskId),

    /// An instance was already pending or running; the request was dropped.
    KeptExisting(TaskId),

    /// A pending instance was cancelled in favour of the new task.
    Replaced { previous: TaskId, task_id: TaskId },
}

impl EnqueueResult {
    /// The task that now holds the key.
    pub fn task_id(&self) -> TaskId {
        match *self {
            EnqueueResult::Enqueued(id) | EnqueueResult::KeptExisting(id) => id,
            EnqueueResult::Replaced { task_id, .. } => task_id,
        }
    }

    pub fn is_new(&self) -> bool {
        !matches!(self, EnqueueResult::KeptExisting(_))
    }
}

/// TaskQueue は durable / at-least-once / 重複排除つきのキュー
///
/// # 契約
/// - `enqueue_unique`: 同じ key の instance が pending/running なら policy に従う
/// - `enqueue_delayed`: `delay` は下限（それより早く実行されない）
/// - Retry outcome を受けたら同じ task を自分の backoff で再配送する
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a task that is due immediately.
    async fn enqueue(&self, job: ChainJob) -> Result<TaskId, QueueError>;

    /// Enqueue under a dedup key.
    async fn enqueue_unique(
        &self,
        key: &DedupKey,
        policy: ExistingPolicy,
        job: ChainJob,
    ) -> Result<EnqueueResult, QueueError>;

    /// Enqueue a task that may not start before `delay` has elapsed.
    async fn enqueue_delayed(&self, job: ChainJob, delay: DelaySeconds)
    -> Result<TaskId, QueueError>;
}
