//! ChainRuntimeBuilder - チェーンの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - queue / oracle / engine は必須
//! - build() 時に不足があれば BuildError を返す

use std::sync::Arc;

use crate::chain::{ChainContext, ChainMonitor, ChainPolicy, ExecutionGuard};
use crate::config::ChainConfig;
use crate::ports::{EnvironmentOracle, SyncEngine, TaskQueue};

use super::runtime::ChainRuntime;

/// BuildError はランタイム構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing collaborators: {0:?}. These must be set before build().")]
    Missing(Vec<&'static str>),

    #[error("fallback delay must be positive")]
    ZeroFallback,
}

/// # 使用例
/// ```ignore
/// let runtime = ChainRuntime::builder()
///     .queue(queue)
///     .oracle(|| Ok(300))
///     .engine(|| Ok(3600))
///     .build()?;
/// ```
#[derive(Default)]
pub struct ChainRuntimeBuilder {
    queue: Option<Arc<dyn TaskQueue>>,
    oracle: Option<Arc<dyn EnvironmentOracle>>,
    engine: Option<Arc<dyn SyncEngine>>,
    guard: Option<ExecutionGuard>,
    policy: ChainPolicy,
    monitor: Option<ChainMonitor>,
}

impl ChainRuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn oracle(mut self, oracle: impl EnvironmentOracle) -> Self {
        self.oracle = Some(Arc::new(oracle));
        self
    }

    pub fn engine(mut self, engine: impl SyncEngine) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Share a guard with another chain. By default each runtime gets its own.
    pub fn guard(mut self, guard: ExecutionGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn policy(mut self, policy: ChainPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn monitor(mut self, monitor: ChainMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Take the dedup key and fallback delay from configuration.
    pub fn config(self, config: &ChainConfig) -> Self {
        self.policy(config.chain_policy())
    }

    pub fn build(self) -> Result<ChainRuntime, BuildError> {
        let mut missing = Vec::new();
        if self.queue.is_none() {
            missing.push("queue");
        }
        if self.oracle.is_none() {
            missing.push("oracle");
        }
        if self.engine.is_none() {
            missing.push("engine");
        }
        let (Some(queue), Some(oracle), Some(engine)) = (self.queue, self.oracle, self.engine)
        else {
            return Err(BuildError::Missing(missing));
        };
        if self.policy.fallback_delay.is_zero() {
            return Err(BuildError::ZeroFallback);
        }

        let ctx = ChainContext {
            queue,
            oracle,
            engine,
            guard: self.guard.unwrap_or_default(),
            policy: self.policy,
        };
        Ok(ChainRuntime::new(ctx, self.monitor.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DelaySeconds;
    use crate::error::BoundaryError;
    use crate::queue::InMemoryQueue;

    fn ok(v: i64) -> impl Fn() -> Result<i64, BoundaryError> + Send + Sync + 'static {
        move || Ok(v)
    }

    #[test]
    fn test_build_success() {
        let runtime = ChainRuntimeBuilder::new()
            .queue(Arc::new(InMemoryQueue::default()))
            .oracle(ok(1))
            .engine(ok(1))
            .build();
        assert!(runtime.is_ok());
    }

    #[test]
    fn test_build_missing_collaborators() {
        let runtime = ChainRuntimeBuilder::new().oracle(ok(1)).build();
        assert!(matches!(
            runtime,
            Err(BuildError::Missing(missing)) if missing == vec!["queue", "engine"]
        ));
    }

    #[test]
    fn test_build_rejects_zero_fallback() {
        let runtime = ChainRuntimeBuilder::new()
            .queue(Arc::new(InMemoryQueue::default()))
            .oracle(ok(1))
            .engine(ok(1))
            .policy(ChainPolicy {
                fallback_delay: DelaySeconds::ZERO,
                ..ChainPolicy::default()
            })
            .build();
        assert!(matches!(runtime, Err(BuildError::ZeroFallback)));
    }

    #[test]
    fn test_shared_guard() {
        let guard = ExecutionGuard::new();
        let build = |guard: ExecutionGuard| {
            ChainRuntimeBuilder::new()
                .queue(Arc::new(InMemoryQueue::default()))
                .oracle(ok(1))
                .engine(ok(1))
                .guard(guard)
                .build()
                .unwrap()
        };
        let a = build(guard.clone());
        let b = build(guard.clone());
        assert!(a.guard().shares_lock_with(b.guard()));

        let c = ChainRuntimeBuilder::new()
            .queue(Arc::new(InMemoryQueue::default()))
            .oracle(ok(1))
            .engine(ok(1))
            .build()
            .unwrap();
        assert!(!a.guard().shares_lock_with(c.guard()));
    }
}
