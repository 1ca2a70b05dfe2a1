//! Opaque computation boundaries.
//!
//! Both calls are blocking and not safe for concurrent entry; callers go
//! through `ExecutionGuard`. Closures implement the traits so tests and
//! embedders can inject behaviour without a wrapper type.

use crate::error::BoundaryError;

/// Answers "how long until the first sync?" in signed seconds.
pub trait EnvironmentOracle: Send + Sync + 'static {
    fn recommended_delay(&self) -> Result<i64, BoundaryError>;
}

/// Performs one synchronization and answers "how long until the next one?".
pub trait SyncEngine: Send + Sync + 'static {
    fn sync(&self) -> Result<i64, BoundaryError>;
}

impl<F> EnvironmentOracle for F
where
    F: Fn() -> Result<i64, BoundaryError> + Send + Sync + 'static,
{
    fn recommended_delay(&self) -> Result<i64, BoundaryError> {
        self()
    }
}

impl<F> SyncEngine for F
where
    F: Fn() -> Result<i64, BoundaryError> + Send + Sync + 'static,
{
    fn sync(&self) -> Result<i64, BoundaryError> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn closures_are_boundaries() {
        let oracle: Arc<dyn EnvironmentOracle> = Arc::new(|| -> Result<i64, BoundaryError> { Ok(300) });
        let engine: Arc<dyn SyncEngine> = Arc::new(|| -> Result<i64, BoundaryError> {
            Err(BoundaryError::new("offline"))
        });

        assert_eq!(oracle.recommended_delay(), Ok(300));
        assert_eq!(engine.sync().unwrap_err().message(), "offline");
    }
}
