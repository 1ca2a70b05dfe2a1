//! RecurringSyncTask - one link of the unbounded chain.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{ChainContext, Scheduled, settle};
use crate::domain::{ChainJob, DelaySeconds, TaskOutcome};
use crate::error::ChainError;

/// Runs the sync engine and schedules its own successor.
///
/// On success exactly one successor is enqueued (never under a dedup key: the
/// chain is causal, so there is at most one pending instance). On failure none
/// is; the chain continues only if the host queue retries this attempt.
pub struct RecurringSyncTask<'a> {
    ctx: &'a ChainContext,
}

impl<'a> RecurringSyncTask<'a> {
    pub fn new(ctx: &'a ChainContext) -> Self {
        Self { ctx }
    }

    pub async fn execute(self) -> TaskOutcome {
        let result = self.run().await;
        settle(ChainJob::Sync, &result)
    }

    #[instrument(name = "sync", skip(self))]
    pub async fn run(&self) -> Result<Scheduled, ChainError> {
        let engine = Arc::clone(&self.ctx.engine);
        let raw = self
            .ctx
            .guard
            .run_blocking(move || engine.sync().map_err(ChainError::Engine))
            .await?;

        let delay = DelaySeconds::or_fallback(raw, self.ctx.policy.fallback_delay);
        if raw <= 0 {
            debug!(raw, fallback_secs = delay.as_secs(), "no recommendation; using fallback cadence");
        }

        let task_id = self.ctx.queue.enqueue_delayed(ChainJob::Sync, delay).await?;
        info!(%task_id, delay_secs = delay.as_secs(), "next sync scheduled");

        Ok(Scheduled { task_id, delay })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::{RecordingQueue, answering, context, failing};
    use crate::domain::FALLBACK_DELAY;
    use rstest::rstest;

    #[rstest]
    #[case(3600, 3600)]
    #[case(1, 1)]
    #[case(0, 86_400)]
    #[case(-7, 86_400)]
    #[case(i64::MAX, i64::MAX as u64)]
    #[case(i64::MIN, 86_400)]
    #[tokio::test]
    async fn schedules_successor_with_engine_delay_or_fallback(
        #[case] engine: i64,
        #[case] expected: u64,
    ) {
        let queue = Arc::new(RecordingQueue::default());
        let ctx = context(Arc::clone(&queue), answering(0), answering(engine));

        let outcome = RecurringSyncTask::new(&ctx).execute().await;

        assert_eq!(outcome, TaskOutcome::Success);
        assert_eq!(
            queue.delayed(),
            vec![(ChainJob::Sync, DelaySeconds::from_secs(expected))]
        );
    }

    #[tokio::test]
    async fn engine_failure_retries_and_schedules_nothing() {
        let queue = Arc::new(RecordingQueue::default());
        let ctx = context(Arc::clone(&queue), answering(0), failing("network down"));

        let outcome = RecurringSyncTask::new(&ctx).execute().await;

        assert_eq!(outcome, TaskOutcome::Retry);
        assert!(queue.delayed().is_empty());
        assert!(queue.unique.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn scheduling_failure_retries() {
        let queue = Arc::new(RecordingQueue::refusing());
        let ctx = context(Arc::clone(&queue), answering(0), answering(60));

        assert_eq!(RecurringSyncTask::new(&ctx).execute().await, TaskOutcome::Retry);
    }

    #[tokio::test]
    async fn custom_fallback_is_honoured() {
        let queue = Arc::new(RecordingQueue::default());
        let mut ctx = context(Arc::clone(&queue), answering(0), answering(0));
        ctx.policy.fallback_delay = DelaySeconds::from_secs(600);

        let scheduled = RecurringSyncTask::new(&ctx).run().await.unwrap();

        assert_eq!(scheduled.delay, DelaySeconds::from_secs(600));
        assert_ne!(scheduled.delay, FALLBACK_DELAY);
    }
}
