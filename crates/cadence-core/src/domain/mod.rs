//! Domain model (ids, delays, jobs, outcomes, chain state).

pub mod delay;
pub mod ids;
pub mod job;
pub mod outcome;
pub mod state;

pub use delay::{DelaySeconds, FALLBACK_DELAY};
pub use ids::{AttemptId, TaskId};
pub use job::{ChainJob, DEFAULT_DEDUP_KEY, DedupKey, ExistingPolicy, TaskEnvelope};
pub use outcome::{Completion, TaskOutcome};
pub use state::{ChainEvent, ChainState};
