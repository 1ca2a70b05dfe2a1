//! ExecutionGuard - 境界呼び出しの排他制御
//!
//! At most one oracle/engine call runs at a time across the whole chain, even
//! if the host queue ever runs two executions at once. The lock is an owned
//! value: clones share it, `ExecutionGuard::new()` makes an independent one.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::error::ChainError;

#[derive(Debug, Clone, Default)]
pub struct ExecutionGuard {
    lock: Arc<Mutex<()>>,
}

impl ExecutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock and return its result unchanged.
    ///
    /// The lock is released when the scope ends, whatever `f` returns or if it
    /// panics. A poisoned lock is recovered: it guards no data.
    pub fn with_exclusive_access<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let _held = self.lock.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("execution guard recovered after a panicked call");
            poisoned.into_inner()
        });
        f()
    }

    /// Same as [`with_exclusive_access`](Self::with_exclusive_access), on the
    /// blocking pool so the calling worker is not stalled.
    ///
    /// No timeout: if `f` never returns, neither does this.
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T, ChainError>
    where
        F: FnOnce() -> Result<T, ChainError> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.clone();
        tokio::task::spawn_blocking(move || guard.with_exclusive_access(f))
            .await
            .map_err(|e| ChainError::LockAcquisition(e.to_string()))?
    }

    /// Do both guards serialize on the same lock?
    pub fn shares_lock_with(&self, other: &ExecutionGuard) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}
