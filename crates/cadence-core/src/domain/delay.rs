//! Delay policy shared by the bootstrap and recurring paths.
//!
//! The oracle and the sync engine both answer with a signed number of seconds.
//! A non-positive answer means "no recommendation"; each path replaces it by
//! its own policy so that a scheduled delay is never negative.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cadence used when the sync engine has no usable recommendation (24h).
pub const FALLBACK_DELAY: DelaySeconds = DelaySeconds::from_secs(24 * 60 * 60);

/// A non-negative delay in whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DelaySeconds(u64);

impl DelaySeconds {
    pub const ZERO: DelaySeconds = DelaySeconds(0);

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Bootstrap policy: `max(0, value)`.
    pub fn clamped(value: i64) -> Self {
        Self(value.max(0) as u64)
    }

    /// Recurring policy: `value` when positive, `fallback` otherwise.
    pub fn or_fallback(value: i64, fallback: DelaySeconds) -> Self {
        if value > 0 {
            Self(value as u64)
        } else {
            fallback
        }
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DelaySeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl From<DelaySeconds> for Duration {
    fn from(delay: DelaySeconds) -> Self {
        delay.as_duration()
    }
}
