//! BootstrapTask - the first link of the chain.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{ChainContext, Scheduled, settle};
use crate::domain::{ChainJob, DelaySeconds, TaskOutcome};
use crate::error::ChainError;

/// Queries the environment oracle once and schedules the first sync.
///
/// Safe to run more than once per key lifetime only because the host queue
/// deduplicates bootstrap enqueues; this type never checks for duplicates.
pub struct BootstrapTask<'a> {
    ctx: &'a ChainContext,
}

impl<'a> BootstrapTask<'a> {
    pub fn new(ctx: &'a ChainContext) -> Self {
        Self { ctx }
    }

    /// Run once. Any failure becomes `Retry`; nothing is scheduled then.
    pub async fn execute(self) -> TaskOutcome {
        let result = self.run().await;
        settle(ChainJob::Bootstrap, &result)
    }

    #[instrument(name = "bootstrap", skip(self))]
    pub async fn run(&self) -> Result<Scheduled, ChainError> {
        let oracle = Arc::clone(&self.ctx.oracle);
        let raw = self
            .ctx
            .guard
            .run_blocking(move || oracle.recommended_delay().map_err(ChainError::Oracle))
            .await?;

        let delay = DelaySeconds::clamped(raw);
        debug!(raw, delay_secs = delay.as_secs(), "oracle answered");

        let task_id = self.ctx.queue.enqueue_delayed(ChainJob::Sync, delay).await?;
        info!(%task_id, delay_secs = delay.as_secs(), "first sync scheduled");

        Ok(Scheduled { task_id, delay })
    }
}
