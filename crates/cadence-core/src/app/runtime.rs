//! Runtime - チェーン全体の実行面
//!
//! Owns the collaborators of one chain and turns a leased envelope into a
//! fresh task execution. Tasks themselves are built per execution and dropped.

use tracing::{Instrument, debug, error, info_span};

use crate::chain::{
    BootstrapTask, ChainContext, ChainMonitor, ChainStatus, ExecutionGuard, RecurringSyncTask,
    Scheduled, Trigger, settle,
};
use crate::domain::{ChainEvent, ChainJob, Completion, TaskEnvelope, TaskOutcome};
use crate::error::ChainError;
use crate::ports::EnqueueResult;

use super::builder::ChainRuntimeBuilder;

pub struct ChainRuntime {
    ctx: ChainContext,
    monitor: ChainMonitor,
}

impl ChainRuntime {
    pub(crate) fn new(ctx: ChainContext, monitor: ChainMonitor) -> Self {
        Self { ctx, monitor }
    }

    pub fn builder() -> ChainRuntimeBuilder {
        ChainRuntimeBuilder::new()
    }

    pub fn context(&self) -> &ChainContext {
        &self.ctx
    }

    pub fn guard(&self) -> &ExecutionGuard {
        &self.ctx.guard
    }

    pub fn monitor(&self) -> &ChainMonitor {
        &self.monitor
    }

    pub fn status(&self) -> ChainStatus {
        self.monitor.snapshot()
    }

    /// Deliver a host signal: enqueue the bootstrap task under the chain's key.
    pub async fn trigger(&self, trigger: Trigger) -> Result<EnqueueResult, ChainError> {
        let result = trigger
            .fire(self.ctx.queue.as_ref(), &self.ctx.policy.dedup_key)
            .await?;
        if result.is_new() {
            self.monitor.apply(ChainEvent::BootstrapEnqueued);
        }
        Ok(result)
    }

    /// Execute one leased task and report its outcome.
    pub async fn execute(&self, envelope: &TaskEnvelope) -> TaskOutcome {
        let job = envelope.job();
        let span = info_span!("execute", task_id = %envelope.task_id(), %job);

        async {
            let result = match job {
                ChainJob::Bootstrap => {
                    self.monitor.apply(ChainEvent::BootstrapStarted);
                    BootstrapTask::new(&self.ctx).run().await
                }
                ChainJob::Sync => {
                    self.monitor.apply(ChainEvent::SyncStarted);
                    RecurringSyncTask::new(&self.ctx).run().await
                }
            };
            self.settle(job, result)
        }
        .instrument(span)
        .await
    }

    fn settle(&self, job: ChainJob, result: Result<Scheduled, ChainError>) -> TaskOutcome {
        if let Ok(scheduled) = &result {
            self.monitor.scheduled(*scheduled);
        }
        settle(job, &result)
    }

    /// Feed back what the host queue did with a finished attempt.
    pub fn record_completion(&self, envelope: &TaskEnvelope, completion: Completion) {
        match (envelope.job(), completion) {
            (_, Completion::Succeeded) => {}
            (ChainJob::Bootstrap, Completion::RetryScheduled { attempt, delay_secs }) => {
                debug!(attempt, delay_secs, "bootstrap will be retried");
                self.monitor.apply(ChainEvent::BootstrapRetried);
            }
            (ChainJob::Sync, Completion::RetryScheduled { attempt, delay_secs }) => {
                debug!(attempt, delay_secs, "sync will be retried");
                self.monitor.apply(ChainEvent::SyncRetried);
            }
            (job, Completion::Dead { attempts }) => {
                error!(
                    task_id = %envelope.task_id(),
                    %job,
                    attempts,
                    "host gave up on the task; the chain is stalled until the next trigger"
                );
                self.monitor.apply(ChainEvent::GaveUp);
            }
        }
    }
}
