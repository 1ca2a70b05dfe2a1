//! Chain - 自己増殖するタスクチェーン
//!
//! - **BootstrapTask**: oracle を 1 回呼び、最初の sync を予約する
//! - **RecurringSyncTask**: engine を呼び、次の自分を予約する
//! - **ExecutionGuard**: 境界呼び出しを直列化する
//! - **Trigger**: boot / service-init などの起動シグナル
//! - **ChainMonitor**: チェーンの状態を観測する
//!
//! Tasks are ephemeral: one is built per execution and dropped afterwards.
//! The only continuity is the chain of enqueue calls.

pub mod bootstrap;
pub mod guard;
pub mod monitor;
pub mod recurring;
pub mod trigger;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use tracing::warn;

pub use self::bootstrap::BootstrapTask;
pub use self::guard::ExecutionGuard;
pub use self::monitor::{ChainMonitor, ChainStatus};
pub use self::recurring::RecurringSyncTask;
pub use self::trigger::Trigger;

use crate::domain::{ChainJob, DedupKey, DelaySeconds, FALLBACK_DELAY, TaskId, TaskOutcome};
use crate::error::ChainError;
use crate::ports::{EnvironmentOracle, SyncEngine, TaskQueue};

/// Per-chain constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPolicy {
    /// Key under which bootstrap triggers collapse.
    pub dedup_key: DedupKey,

    /// Spacing used when the engine gives no positive recommendation. Never zero.
    pub fallback_delay: DelaySeconds,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self {
            dedup_key: DedupKey::default(),
            fallback_delay: FALLBACK_DELAY,
        }
    }
}

/// Collaborators shared by every execution of one chain.
#[derive(Clone)]
pub struct ChainContext {
    pub queue: Arc<dyn TaskQueue>,
    pub oracle: Arc<dyn EnvironmentOracle>,
    pub engine: Arc<dyn SyncEngine>,
    pub guard: ExecutionGuard,
    pub policy: ChainPolicy,
}

/// The successor a successful execution put on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub task_id: TaskId,
    pub delay: DelaySeconds,
}

/// Collapse an execution result into the binary outcome the host understands.
pub(crate) fn settle(job: ChainJob, result: &Result<Scheduled, ChainError>) -> TaskOutcome {
    match result {
        Ok(_) => TaskOutcome::Success,
        Err(err) => {
            warn!(%job, error = %err, "execution failed; leaving it to the host queue to retry");
            TaskOutcome::Retry
        }
    }
}
