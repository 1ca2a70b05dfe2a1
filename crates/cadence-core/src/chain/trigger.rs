//! Trigger - チェーンを起動するホストシグナル
//!
//! Every trigger maps to the same deduplicated bootstrap enqueue. Concurrent
//! triggers collapse in the host queue under the keep-existing policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{ChainJob, DedupKey, ExistingPolicy};
use crate::error::ChainError;
use crate::ports::{EnqueueResult, TaskQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The host finished booting.
    BootCompleted,

    /// Explicit request to (re)initialise the chain.
    ServiceInit,

    /// The application was updated in place.
    PackageReplaced,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::BootCompleted => "boot_completed",
            Trigger::ServiceInit => "service_init",
            Trigger::PackageReplaced => "package_replaced",
        }
    }

    /// Enqueue the bootstrap task under `key`, keeping any pending instance.
    pub async fn fire(
        self,
        queue: &dyn TaskQueue,
        key: &DedupKey,
    ) -> Result<EnqueueResult, ChainError> {
        let result = queue
            .enqueue_unique(key, ExistingPolicy::KeepExisting, ChainJob::Bootstrap)
            .await?;

        match result {
            EnqueueResult::KeptExisting(task_id) => {
                debug!(trigger = %self, %key, %task_id, "bootstrap already pending; trigger dropped");
            }
            _ => {
                info!(trigger = %self, %key, task_id = %result.task_id(), "bootstrap enqueued");
            }
        }
        Ok(result)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "boot" | "boot_completed" => Ok(Trigger::BootCompleted),
            "init" | "service_init" => Ok(Trigger::ServiceInit),
            "package_replaced" | "replaced" => Ok(Trigger::PackageReplaced),
            _ => Err(ChainError::UnknownTrigger(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::RecordingQueue;

    #[tokio::test]
    async fn every_trigger_enqueues_bootstrap_with_keep_existing() {
        let queue = RecordingQueue::default();
        let key = DedupKey::new("k");

        for trigger in [
            Trigger::BootCompleted,
            Trigger::ServiceInit,
            Trigger::PackageReplaced,
        ] {
            trigger.fire(&queue, &key).await.unwrap();
        }

        let recorded = queue.unique.lock().unwrap().clone();
        assert_eq!(recorded.len(), 3);
        for (k, policy, job) in recorded {
            assert_eq!(k, key);
            assert_eq!(policy, ExistingPolicy::KeepExisting);
            assert_eq!(job, ChainJob::Bootstrap);
        }
    }

    #[test]
    fn parses_host_signal_names() {
        assert_eq!("boot".parse::<Trigger>().unwrap(), Trigger::BootCompleted);
        assert_eq!("BOOT_COMPLETED".parse::<Trigger>().unwrap(), Trigger::BootCompleted);
        assert_eq!("service-init".parse::<Trigger>().unwrap(), Trigger::ServiceInit);
        assert_eq!("package_replaced".parse::<Trigger>().unwrap(), Trigger::PackageReplaced);
        assert!(matches!(
            "screen_on".parse::<Trigger>(),
            Err(ChainError::UnknownTrigger(s)) if s == "screen_on"
        ));
    }
}
