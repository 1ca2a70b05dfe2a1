//! Test doubles for chain unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ChainContext, ChainPolicy, ExecutionGuard};
use crate::domain::{ChainJob, DedupKey, DelaySeconds, ExistingPolicy, TaskId};
use crate::error::BoundaryError;
use crate::ports::{EnqueueResult, QueueError, TaskQueue};

/// Records every enqueue; optionally refuses all of them.
#[derive(Default)]
pub(crate) struct RecordingQueue {
    pub delayed: Mutex<Vec<(ChainJob, DelaySeconds)>>,
    pub unique: Mutex<Vec<(DedupKey, ExistingPolicy, ChainJob)>>,
    pub refuse: bool,
}

impl RecordingQueue {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn delayed(&self) -> Vec<(ChainJob, DelaySeconds)> {
        self.delayed.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), QueueError> {
        if self.refuse {
            Err(QueueError::OperationFailed("refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, job: ChainJob) -> Result<TaskId, QueueError> {
        self.enqueue_delayed(job, DelaySeconds::ZERO).await
    }

    async fn enqueue_unique(
        &self,
        key: &DedupKey,
        policy: ExistingPolicy,
        job: ChainJob,
    ) -> Result<EnqueueResult, QueueError> {
        self.check()?;
        self.unique.lock().unwrap().push((key.clone(), policy, job));
        Ok(EnqueueResult::Enqueued(TaskId::generate()))
    }

    async fn enqueue_delayed(
        &self,
        job: ChainJob,
        delay: DelaySeconds,
    ) -> Result<TaskId, QueueError> {
        self.check()?;
        self.delayed.lock().unwrap().push((job, delay));
        Ok(TaskId::generate())
    }
}

pub(crate) fn answering(value: i64) -> impl Fn() -> Result<i64, BoundaryError> + Send + Sync + 'static {
    move || Ok(value)
}

pub(crate) fn failing(message: &'static str) -> impl Fn() -> Result<i64, BoundaryError> + Send + Sync + 'static {
    move || Err(BoundaryError::new(message))
}

pub(crate) fn context(
    queue: Arc<RecordingQueue>,
    oracle: impl Fn() -> Result<i64, BoundaryError> + Send + Sync + 'static,
    engine: impl Fn() -> Result<i64, BoundaryError> + Send + Sync + 'static,
) -> ChainContext {
    ChainContext {
        queue,
        oracle: Arc::new(oracle),
        engine: Arc::new(engine),
        guard: ExecutionGuard::new(),
        policy: ChainPolicy::default(),
    }
}
