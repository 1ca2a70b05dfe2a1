use serde::{Deserialize, Serialize};

/// Task counts of a host queue, by state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub delayed: usize,
    pub running: usize,
    pub succeeded: usize,
    pub retry_scheduled: usize,
    pub dead: usize,
    pub cancelled: usize,
}

impl QueueCounts {
    /// Tasks that will still run.
    pub fn pending(&self) -> usize {
        self.queued + self.delayed + self.running + self.retry_scheduled
    }
}
