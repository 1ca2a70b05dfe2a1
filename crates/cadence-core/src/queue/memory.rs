//! In-memory queue implementation.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{RetryPolicy, TaskLease, TaskRecord, TaskSource, TaskState};
use crate::domain::{
    AttemptId, ChainJob, Completion, DedupKey, DelaySeconds, ExistingPolicy, TaskEnvelope, TaskId,
    TaskOutcome,
};
use crate::observability::QueueCounts;
use crate::ports::{EnqueueResult, QueueError, TaskQueue};

/// Finished tasks and schedule log entries kept for inspection, by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

/// Longest wait the queue will arm a timer for (about 30 years).
/// Longer delays still hold the task back; they just never come due.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, saturating at [`FAR_FUTURE`] instead of overflowing.
fn deadline(now: Instant, delay: Duration) -> Instant {
    now + delay.min(FAR_FUTURE)
}

/// Scheduled task entry for priority queue.
///
/// Reverse ordering so BinaryHeap acts as a min-heap (earliest first); `seq`
/// keeps equal deadlines in enqueue order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledTask {
    not_before: Instant,
    seq: u64,
    task_id: TaskId,
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .not_before
            .cmp(&self.not_before)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// One enqueue, as the queue saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub task_id: TaskId,
    pub job: ChainJob,
    pub delay: DelaySeconds,
    pub enqueued_at: Instant,
    pub not_before: Instant,
}

struct InMemoryQueueState {
    /// All task records (single source of truth).
    records: HashMap<TaskId, TaskRecord>,

    /// Ready queue (TaskIds only).
    ready: VecDeque<TaskId>,

    /// Delayed first runs and retry backoffs.
    scheduled: BinaryHeap<ScheduledTask>,

    /// Dedup key -> task currently holding it.
    unique: HashMap<DedupKey, TaskId>,

    /// Most recent enqueues, oldest first. Bounded by `history_limit`.
    log: VecDeque<ScheduleEntry>,

    /// Finished tasks still kept in `records`, oldest first.
    finished: VecDeque<TaskId>,

    /// Finished tasks ever, including those already evicted.
    totals: QueueCounts,

    history_limit: usize,
    seq: u64,
    retry_policy: RetryPolicy,
    closed: bool,
}

impl InMemoryQueueState {
    fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            records: HashMap::new(),
            ready: VecDeque::new(),
            scheduled: BinaryHeap::new(),
            unique: HashMap::new(),
            log: VecDeque::new(),
            finished: VecDeque::new(),
            totals: QueueCounts::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            seq: 0,
            retry_policy,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.closed {
            Err(QueueError::Closed)
        } else {
            Ok(())
        }
    }

    fn push_scheduled(&mut self, not_before: Instant, task_id: TaskId) {
        self.seq += 1;
        self.scheduled.push(ScheduledTask {
            not_before,
            seq: self.seq,
            task_id,
        });
    }

    fn insert(&mut self, job: ChainJob, delay: DelaySeconds, key: Option<DedupKey>) -> TaskId {
        let task_id = TaskId::generate();
        let now = Instant::now();
        let not_before = deadline(now, delay.as_duration());

        let mut record = TaskRecord::new(TaskEnvelope::new(task_id, job), key.clone());
        if delay.is_zero() {
            self.ready.push_back(task_id);
        } else {
            record.delay_until(not_before);
            self.push_scheduled(not_before, task_id);
        }
        self.records.insert(task_id, record);
        if let Some(key) = key {
            self.unique.insert(key, task_id);
        }

        if self.history_limit > 0 {
            if self.log.len() == self.history_limit {
                self.log.pop_front();
            }
            self.log.push_back(ScheduleEntry {
                task_id,
                job,
                delay,
                enqueued_at: now,
                not_before,
            });
        }
        debug!(%task_id, %job, delay_secs = delay.as_secs(), "task enqueued");
        task_id
    }

    /// Move tasks from scheduled to ready if their time has come.
    fn promote_due(&mut self, now: Instant) {
        while let Some(entry) = self.scheduled.peek() {
            if entry.not_before > now {
                break; // Heap is sorted, so we can stop
            }
            let Some(entry) = self.scheduled.pop() else {
                break;
            };
            if let Some(record) = self.records.get_mut(&entry.task_id)
                && record.state.is_waiting()
            {
                record.requeue();
                self.ready.push_back(entry.task_id);
            }
        }
    }

    /// Free the dedup key held by `task_id`, if it still holds one.
    fn release_key(&mut self, task_id: TaskId) {
        let key = self
            .records
            .get(&task_id)
            .and_then(|record| record.unique_key.clone());
        if let Some(key) = key
            && self.unique.get(&key) == Some(&task_id)
        {
            self.unique.remove(&key);
        }
    }

    /// Book a task that just reached a terminal state, evicting the oldest
    /// finished records beyond `history_limit`.
    fn retire(&mut self, task_id: TaskId) {
        let Some(state) = self.records.get(&task_id).map(|record| record.state) else {
            return;
        };
        match state {
            TaskState::Succeeded => self.totals.succeeded += 1,
            TaskState::Dead => self.totals.dead += 1,
            TaskState::Cancelled => self.totals.cancelled += 1,
            _ => return,
        }
        self.finished.push_back(task_id);
        while self.finished.len() > self.history_limit {
            if let Some(oldest) = self.finished.pop_front() {
                self.records.remove(&oldest);
            }
        }
    }

    /// Task currently holding `key`, unless it already finished.
    fn live_holder(&self, key: &DedupKey) -> Option<(TaskId, TaskState)> {
        let task_id = *self.unique.get(key)?;
        let record = self.records.get(&task_id)?;
        (!record.state.is_terminal()).then_some((task_id, record.state))
    }

    fn counts_by_state(&self) -> QueueCounts {
        // terminal states come from the running totals, so evicted tasks still count
        let mut counts = QueueCounts {
            succeeded: self.totals.succeeded,
            dead: self.totals.dead,
            cancelled: self.totals.cancelled,
            ..QueueCounts::default()
        };
        for record in self.records.values() {
            match record.state {
                TaskState::Queued => counts.queued += 1,
                TaskState::Delayed => counts.delayed += 1,
                TaskState::Running => counts.running += 1,
                TaskState::RetryScheduled => counts.retry_scheduled += 1,
                TaskState::Succeeded | TaskState::Dead | TaskState::Cancelled => {}
            }
        }
        counts
    }
}

/// In-memory queue implementation.
///
/// Time is `tokio::time::Instant`, so tests can pause and advance it.
pub struct InMemoryQueue {
    state: Arc<Mutex<InMemoryQueueState>>,
    notify: Arc<Notify>,
}

impl InMemoryQueue {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self::with_history_limit(retry_policy, DEFAULT_HISTORY_LIMIT)
    }

    /// Keep at most `limit` finished tasks and schedule log entries.
    /// Pending and running tasks are never evicted.
    pub fn with_history_limit(retry_policy: RetryPolicy, limit: usize) -> Self {
        let mut state = InMemoryQueueState::new(retry_policy);
        state.history_limit = limit;
        Self {
            state: Arc::new(Mutex::new(state)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Tasks currently kept in memory, pending and finished.
    pub async fn retained(&self) -> usize {
        self.state.lock().await.records.len()
    }

    /// Stop handing out leases and refuse new work. Pending leases return `None`.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
        info!("queue closed");
    }

    /// The most recent enqueues, oldest first (at most the history limit).
    pub async fn schedule_log(&self) -> Vec<ScheduleEntry> {
        self.state.lock().await.log.iter().cloned().collect()
    }

    pub async fn task_state(&self, task_id: TaskId) -> Option<TaskState> {
        self.state
            .lock()
            .await
            .records
            .get(&task_id)
            .map(|record| record.state)
    }

    /// Tasks of `job` that have not finished (waiting, queued or running).
    pub async fn unfinished(&self, job: ChainJob) -> usize {
        self.state
            .lock()
            .await
            .records
            .values()
            .filter(|record| record.envelope.job() == job && !record.state.is_terminal())
            .count()
    }

    async fn add(
        &self,
        job: ChainJob,
        delay: DelaySeconds,
        key: Option<DedupKey>,
    ) -> Result<TaskId, QueueError> {
        let task_id = {
            let mut state = self.state.lock().await;
            state.ensure_open()?;
            state.insert(job, delay, key)
        };
        // Wake a worker: either the task is ready, or the next wake-up moved.
        self.notify.notify_one();
        Ok(task_id)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn enqueue(&self, job: ChainJob) -> Result<TaskId, QueueError> {
        self.add(job, DelaySeconds::ZERO, None).await
    }

    async fn enqueue_unique(
        &self,
        key: &DedupKey,
        policy: ExistingPolicy,
        job: ChainJob,
    ) -> Result<EnqueueResult, QueueError> {
        let result = {
            let mut state = self.state.lock().await;
            state.ensure_open()?;

            match (state.live_holder(key), policy) {
                (None, _) => EnqueueResult::Enqueued(state.insert(job, DelaySeconds::ZERO, Some(key.clone()))),
                (Some((existing, _)), ExistingPolicy::KeepExisting) => {
                    return Ok(EnqueueResult::KeptExisting(existing));
                }
                (Some((existing, TaskState::Running)), ExistingPolicy::Replace) => {
                    debug!(%key, task_id = %existing, "holder is running; keeping it");
                    return Ok(EnqueueResult::KeptExisting(existing));
                }
                (Some((previous, _)), ExistingPolicy::Replace) => {
                    if let Some(record) = state.records.get_mut(&previous) {
                        record.cancel();
                    }
                    state.retire(previous);
                    let task_id = state.insert(job, DelaySeconds::ZERO, Some(key.clone()));
                    EnqueueResult::Replaced { previous, task_id }
                }
            }
        };
        self.notify.notify_one();
        Ok(result)
    }

    async fn enqueue_delayed(
        &self,
        job: ChainJob,
        delay: DelaySeconds,
    ) -> Result<TaskId, QueueError> {
        self.add(job, delay, None).await
    }
}

#[async_trait]
impl TaskSource for InMemoryQueue {
    async fn lease(&self) -> Option<Box<dyn TaskLease>> {
        loop {
            // Register interest before looking, so a notify between the check
            // and the wait is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next_wake = {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                state.promote_due(Instant::now());

                while let Some(task_id) = state.ready.pop_front() {
                    let Some(record) = state.records.get_mut(&task_id) else {
                        continue;
                    };
                    if !record.state.is_runnable() {
                        continue; // cancelled while queued
                    }
                    record.start_attempt();
                    let lease = InMemoryLease {
                        task_id,
                        envelope: record.envelope.clone(),
                        attempt: record.attempts,
                        attempt_id: AttemptId::generate(),
                        queue: Arc::clone(&self.state),
                        notify: Arc::clone(&self.notify),
                    };
                    return Some(Box::new(lease));
                }

                state.scheduled.peek().map(|entry| entry.not_before)
            };

            // Wait for notification OR next scheduled task time
            match next_wake {
                Some(wake_time) => {
                    tokio::select! {
                        _ = notified.as_mut() => {},
                        _ = tokio::time::sleep_until(wake_time) => {},
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn counts_by_state(&self) -> Result<QueueCounts, QueueError> {
        let state = self.state.lock().await;
        Ok(state.counts_by_state())
    }
}

/// Lease implementation for InMemoryQueue.
struct InMemoryLease {
    task_id: TaskId,
    envelope: TaskEnvelope,
    attempt: u32,
    attempt_id: AttemptId,
    queue: Arc<Mutex<InMemoryQueueState>>,
    notify: Arc<Notify>,
}

#[async_trait]
impl TaskLease for InMemoryLease {
    fn envelope(&self) -> &TaskEnvelope {
        &self.envelope
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    async fn complete(self: Box<Self>, outcome: TaskOutcome) -> Result<Completion, QueueError> {
        let task_id = self.task_id;
        let completion = {
            let mut state = self.queue.lock().await;
            let policy = state.retry_policy.clone();
            let Some(record) = state.records.get_mut(&task_id) else {
                return Err(QueueError::TaskNotFound(task_id));
            };

            match outcome {
                TaskOutcome::Success => {
                    record.mark_succeeded();
                    state.release_key(task_id);
                    state.retire(task_id);
                    Completion::Succeeded
                }
                TaskOutcome::Retry if !policy.allows_retry(record.attempts) => {
                    let attempts = record.attempts;
                    record.mark_dead();
                    state.release_key(task_id);
                    state.retire(task_id);
                    warn!(%task_id, job = %self.envelope.job(), attempts, "retry budget exhausted; task is dead");
                    Completion::Dead { attempts }
                }
                TaskOutcome::Retry => {
                    let delay = policy.next_delay(record.attempts);
                    let next_run_at = deadline(Instant::now(), delay);
                    let attempt = record.attempts;
                    record.schedule_retry(next_run_at);
                    state.push_scheduled(next_run_at, task_id);
                    debug!(%task_id, attempt, delay_secs = delay.as_secs(), "retry scheduled");
                    Completion::RetryScheduled {
                        attempt,
                        delay_secs: delay.as_secs(),
                    }
                }
            }
        }; // Lock released here

        if matches!(completion, Completion::RetryScheduled { .. }) {
            self.notify.notify_one();
        }
        Ok(completion)
    }
}
