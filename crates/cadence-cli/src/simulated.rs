//! Stand-ins for the platform pieces the core only sees through traits.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use cadence_core::BoundaryError;
use cadence_core::ports::SyncEngine;
use cadence_core::service::{
    ChannelSpec, NativeLoop, ServiceError, StatusChannel, StatusNotice,
};
use tracing::{debug, info};

/// Answers a fixed delay; every `fail_every`-th call fails.
pub struct SimulatedEngine {
    delay: i64,
    fail_every: u32,
    calls: AtomicU32,
}

impl SimulatedEngine {
    pub fn new(delay: i64, fail_every: u32) -> Self {
        Self {
            delay,
            fail_every,
            calls: AtomicU32::new(0),
        }
    }
}

impl SyncEngine for SimulatedEngine {
    fn sync(&self) -> Result<i64, BoundaryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && call % self.fail_every == 0 {
            return Err(BoundaryError::new(format!("simulated failure on call {call}")));
        }
        info!(call, delay = self.delay, "sync done");
        Ok(self.delay)
    }
}

/// Ticks once a second until stopped.
#[derive(Default)]
pub struct SimulatedLoop {
    stopped: AtomicBool,
    ticks: AtomicU64,
}

impl SimulatedLoop {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl NativeLoop for SimulatedLoop {
    fn run(&self) -> Result<(), ServiceError> {
        while !self.stopped.swap(false, Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let ticks = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
            if ticks % 10 == 0 {
                debug!(ticks, "native loop alive");
            }
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Logs status entries instead of showing them.
#[derive(Default)]
pub struct ConsoleChannel {
    channels: Mutex<HashSet<String>>,
}

impl StatusChannel for ConsoleChannel {
    fn channel_exists(&self, id: &str) -> bool {
        self.channels
            .lock()
            .map(|channels| channels.contains(id))
            .unwrap_or(false)
    }

    fn create_channel(&self, spec: &ChannelSpec) -> Result<(), ServiceError> {
        self.channels
            .lock()
            .map_err(|e| ServiceError::Channel(e.to_string()))?
            .insert(spec.id.clone());
        info!(channel = %spec.id, importance = ?spec.importance, "status channel created");
        Ok(())
    }

    fn post(&self, channel_id: &str, notice: &StatusNotice) -> Result<(), ServiceError> {
        info!(channel = channel_id, title = %notice.title, text = %notice.text, "status");
        Ok(())
    }

    fn clear(&self, channel_id: &str) {
        info!(channel = channel_id, "status cleared");
    }
}
