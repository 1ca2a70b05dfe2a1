//! ChainMonitor - チェーンの状態と統計
//!
//! The monitor only observes. Nothing in the chain reads it to make a
//! scheduling decision.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::debug;

use super::Scheduled;
use crate::domain::{ChainEvent, ChainState, TaskId};

/// Serializable snapshot of one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChainStatus {
    pub state: ChainState,
    pub bootstrap_runs: u64,
    pub sync_runs: u64,
    pub retries: u64,
    pub stalls: u64,
    /// Delay chosen by the last successful execution.
    pub last_delay_secs: Option<u64>,
    /// Task that was scheduled last.
    pub next_task: Option<TaskId>,
}

#[derive(Debug, Clone, Default)]
pub struct ChainMonitor {
    inner: Arc<Mutex<ChainStatus>>,
}

impl ChainMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChainStatus> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an event and return the resulting state.
    pub fn apply(&self, event: ChainEvent) -> ChainState {
        let mut status = self.lock();
        match event {
            ChainEvent::BootstrapStarted => status.bootstrap_runs += 1,
            ChainEvent::SyncStarted => status.sync_runs += 1,
            ChainEvent::BootstrapRetried | ChainEvent::SyncRetried => status.retries += 1,
            ChainEvent::GaveUp => status.stalls += 1,
            ChainEvent::BootstrapEnqueued | ChainEvent::SyncScheduled => {}
        }

        match status.state.on(event) {
            Some(next) => status.state = next,
            None => debug!(state = ?status.state, ?event, "ignoring event in current state"),
        }
        status.state
    }

    /// Record a successfully scheduled successor.
    pub fn scheduled(&self, scheduled: Scheduled) -> ChainState {
        {
            let mut status = self.lock();
            status.last_delay_secs = Some(scheduled.delay.as_secs());
            status.next_task = Some(scheduled.task_id);
        }
        self.apply(ChainEvent::SyncScheduled)
    }

    pub fn state(&self) -> ChainState {
        self.lock().state
    }

    pub fn snapshot(&self) -> ChainStatus {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DelaySeconds;

    #[test]
    fn counts_runs_and_tracks_last_delay() {
        let monitor = ChainMonitor::new();
        monitor.apply(ChainEvent::BootstrapEnqueued);
        monitor.apply(ChainEvent::BootstrapStarted);
        let task_id = TaskId::generate();
        monitor.scheduled(Scheduled {
            task_id,
            delay: DelaySeconds::from_secs(300),
        });
        monitor.apply(ChainEvent::SyncStarted);
        monitor.apply(ChainEvent::SyncRetried);

        let status = monitor.snapshot();
        assert_eq!(status.state, ChainState::SyncRetry);
        assert_eq!(status.bootstrap_runs, 1);
        assert_eq!(status.sync_runs, 1);
        assert_eq!(status.retries, 1);
        assert_eq!(status.last_delay_secs, Some(300));
        assert_eq!(status.next_task, Some(task_id));
    }

    #[test]
    fn clones_observe_the_same_chain() {
        let a = ChainMonitor::new();
        let b = a.clone();
        a.apply(ChainEvent::BootstrapEnqueued);
        assert_eq!(b.state(), ChainState::BootstrapPending);
    }

    #[test]
    fn snapshot_serializes() {
        let monitor = ChainMonitor::new();
        let v = serde_json::to_value(monitor.snapshot()).unwrap();
        assert_eq!(v["state"], "not_started");
        assert_eq!(v["sync_runs"], 0);
    }
}
