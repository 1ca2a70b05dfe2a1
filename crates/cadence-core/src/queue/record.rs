//! Task record: metadata + envelope.

use tokio::time::Instant;

use super::TaskState;
use crate::domain::{DedupKey, TaskEnvelope};

/// Metadata + envelope for a task in the queue.
///
/// This is the single source of truth for task state; the ready and scheduled
/// structures hold TaskIds only.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub envelope: TaskEnvelope,
    pub state: TaskState,

    /// Dedup key this task holds, if it was enqueued as unique work.
    pub unique_key: Option<DedupKey>,

    /// Number of times this task has been executed (including current attempt if Running).
    pub attempts: u32,

    /// Earliest time the task may run (Delayed / RetryScheduled).
    pub not_before: Option<Instant>,

    pub created_at: Instant,
    pub updated_at: Instant,
}

impl TaskRecord {
    pub fn new(envelope: TaskEnvelope, unique_key: Option<DedupKey>) -> Self {
        let now = Instant::now();
        Self {
            envelope,
            state: TaskState::Queued,
            unique_key,
            attempts: 0,
            not_before: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hold the task back until `not_before`.
    pub fn delay_until(&mut self, not_before: Instant) {
        self.state = TaskState::Delayed;
        self.not_before = Some(not_before);
        self.updated_at = Instant::now();
    }

    /// Mark as running (increment attempts).
    pub fn start_attempt(&mut self) {
        self.state = TaskState::Running;
        self.attempts += 1;
        self.updated_at = Instant::now();
    }

    pub fn mark_succeeded(&mut self) {
        self.state = TaskState::Succeeded;
        self.updated_at = Instant::now();
    }

    pub fn mark_dead(&mut self) {
        self.state = TaskState::Dead;
        self.updated_at = Instant::now();
    }

    pub fn cancel(&mut self) {
        self.state = TaskState::Cancelled;
        self.not_before = None;
        self.updated_at = Instant::now();
    }

    /// Schedule retry with backoff.
    pub fn schedule_retry(&mut self, next_run_at: Instant) {
        self.state = TaskState::RetryScheduled;
        self.not_before = Some(next_run_at);
        self.updated_at = Instant::now();
    }

    /// Move from Delayed / RetryScheduled back to Queued.
    pub fn requeue(&mut self) {
        self.state = TaskState::Queued;
        self.not_before = None;
        self.updated_at = Instant::now();
    }
}
