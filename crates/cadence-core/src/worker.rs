//! Worker - lease → execute → complete ループ
//!
//! 各ワーカーは shutdown を受けるまで queue から lease を取り続ける。

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::ChainRuntime;
use crate::queue::TaskSource;

/// Worker group handle.
/// - `request_shutdown()` で新しい lease の取得を止める
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
///
/// Workers stand in for the host's execution contexts: each lease runs to
/// completion on one worker, and the outcome goes straight back to the queue.
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(n: usize, source: Arc<dyn TaskSource>, runtime: Arc<ChainRuntime>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let source = Arc::clone(&source);
            let runtime = Arc::clone(&runtime);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, source, runtime, &mut rx).await;
            });
            joins.push(join);
        }
        info!(workers = n, "worker group started");

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all workers.
    /// In-flight executions are not cancelled; workers just stop taking leases.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
        info!("worker group stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    source: Arc<dyn TaskSource>,
    runtime: Arc<ChainRuntime>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // lease は「待つ」可能性があるので select で shutdown と競合させる
        let lease = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break; // group dropped
                }
                continue;
            }
            lease = source.lease() => lease,
        };

        let Some(lease) = lease else {
            // queue closed
            debug!(worker_id, "queue closed; worker exiting");
            break;
        };

        let envelope = lease.envelope().clone();
        let attempt = lease.attempt();
        let attempt_id = lease.attempt_id();
        debug!(worker_id, task_id = %envelope.task_id(), job = %envelope.job(), attempt, %attempt_id, "leased");

        let outcome = runtime.execute(&envelope).await;

        match lease.complete(outcome).await {
            Ok(completion) => runtime.record_completion(&envelope, completion),
            Err(e) => warn!(worker_id, task_id = %envelope.task_id(), %attempt_id, error = %e, "completion report failed"),
        }
    }
}
