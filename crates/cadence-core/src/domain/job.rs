//! Jobs carried by the host queue.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskId;

/// Default identity under which bootstrap triggers collapse.
///
/// Hosts migrating an existing deployment should configure the key already in
/// use there (for example `system_cache_init`) so queued work keeps deduplicating.
pub const DEFAULT_DEDUP_KEY: &str = "chain_bootstrap";

/// Which link of the chain a queued task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainJob {
    /// Queries the environment oracle once and schedules the first sync.
    Bootstrap,

    /// Runs the sync engine and schedules its own successor.
    Sync,
}

impl ChainJob {
    pub fn as_str(self) -> &'static str {
        match self {
            ChainJob::Bootstrap => "bootstrap",
            ChainJob::Sync => "sync",
        }
    }
}

impl fmt::Display for ChainJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity used by the host queue to collapse duplicate enqueues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DedupKey {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_KEY)
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What `enqueue_unique` does when a task is already pending under the key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingPolicy {
    /// Drop the new request; the pending or running instance wins.
    #[default]
    KeepExisting,

    /// Cancel a pending (not yet running) instance and enqueue the new one.
    /// A running instance is kept.
    Replace,
}

/// TaskId + ChainJob の“運搬用”データ。ホスト側キューが永続化する形。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    task_id: TaskId,
    job: ChainJob,
}

impl TaskEnvelope {
    pub fn new(task_id: TaskId, job: ChainJob) -> Self {
        Self { task_id, job }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn job(&self) -> ChainJob {
        self.job
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_roundtrip_json() {
        let env = TaskEnvelope::new(TaskId::generate(), ChainJob::Sync);
        let s = serde_json::to_string(&env).unwrap();
        let back: TaskEnvelope = serde_json::from_str(&s).unwrap();
        assert_eq!(back, env);

        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["job"], "sync");
    }

    #[test]
    fn default_policy_keeps_existing() {
        assert_eq!(ExistingPolicy::default(), ExistingPolicy::KeepExisting);
        assert_eq!(DedupKey::default().as_str(), DEFAULT_DEDUP_KEY);
    }
}
