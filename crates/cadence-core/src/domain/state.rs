//! Chain-level state machine.
//!
//! State transitions:
//! - NotStarted -> BootstrapPending -> BootstrapRunning -> SyncScheduled
//! - BootstrapRunning -> BootstrapRetry -> BootstrapRunning (host retry)
//! - SyncScheduled -> SyncRunning -> SyncScheduled (new delay)
//! - SyncRunning -> SyncRetry -> SyncRunning (host retry)
//! - *Running -> Stalled (host retry budget exhausted)
//! - Stalled -> BootstrapPending (a later trigger restarts the chain)
//!
//! There is no designed terminal state. `Stalled` is abnormal loss of liveness.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    #[default]
    NotStarted,
    BootstrapPending,
    BootstrapRunning,
    BootstrapRetry,
    SyncScheduled,
    SyncRunning,
    SyncRetry,
    Stalled,
}

/// Something that happened to the chain, as observed by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEvent {
    BootstrapEnqueued,
    BootstrapStarted,
    BootstrapRetried,
    SyncScheduled,
    SyncStarted,
    SyncRetried,
    GaveUp,
}

impl ChainState {
    /// Apply an event. Returns `None` when the event is not valid in this state.
    pub fn on(self, event: ChainEvent) -> Option<ChainState> {
        use ChainEvent as E;
        use ChainState as S;

        let next = match (self, event) {
            (S::NotStarted | S::Stalled, E::BootstrapEnqueued) => S::BootstrapPending,
            (S::BootstrapPending | S::BootstrapRetry, E::BootstrapStarted) => S::BootstrapRunning,
            (S::BootstrapRunning, E::BootstrapRetried) => S::BootstrapRetry,
            (S::BootstrapRunning | S::SyncRunning, E::SyncScheduled) => S::SyncScheduled,
            (S::SyncScheduled | S::SyncRetry, E::SyncStarted) => S::SyncRunning,
            (S::SyncRunning, E::SyncRetried) => S::SyncRetry,
            (S::BootstrapRunning | S::SyncRunning, E::GaveUp) => S::Stalled,
            _ => return None,
        };
        Some(next)
    }

    /// Is the chain expected to make progress on its own?
    pub fn is_live(self) -> bool {
        !matches!(self, ChainState::NotStarted | ChainState::Stalled)
    }
}
