//! Service mode - 常駐ループの起動/停止
//!
//! The alternate execution mode: no rescheduling chain. The host starts the
//! service once, a long-lived loop runs on its own thread until the host stops
//! it, and a persistent low-priority status entry stays up meanwhile.
//!
//! Stopping is best-effort. A failing or panicking `stop` is swallowed so that
//! shutdown always completes. A stopped loop is not joined, but it must have
//! exited before the next `start` spawns another one.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("native loop failed: {0}")]
    Loop(String),

    #[error("status channel failed: {0}")]
    Channel(String),

    #[error("failed to spawn loop thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("previous loop did not exit within {0:?}")]
    StillStopping(Duration),
}

/// A long-lived blocking loop controlled by explicit start/stop signals.
pub trait NativeLoop: Send + Sync + 'static {
    /// Runs until `stop` is called or the loop ends on its own.
    fn run(&self) -> Result<(), ServiceError>;

    /// Ask a running loop to return. May be called from any thread.
    fn stop(&self) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Min,
    Low,
    Default,
}

/// Where status entries are posted. Created once, reused afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
    pub show_badge: bool,
}

impl ChannelSpec {
    /// A quiet channel for background status: minimum importance, no badge.
    pub fn background(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            description: format!("{name} status"),
            name,
            importance: Importance::Min,
            show_badge: false,
        }
    }
}

/// One persistent status entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub title: String,
    pub text: String,
    pub ongoing: bool,
    pub only_alert_once: bool,
}

impl StatusNotice {
    pub fn ongoing(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            ongoing: true,
            only_alert_once: true,
        }
    }
}

/// Host facility that presents status entries.
pub trait StatusChannel: Send + Sync {
    fn channel_exists(&self, id: &str) -> bool;

    fn create_channel(&self, spec: &ChannelSpec) -> Result<(), ServiceError>;

    fn post(&self, channel_id: &str, notice: &StatusNotice) -> Result<(), ServiceError>;

    fn clear(&self, channel_id: &str);
}

/// How long `start` waits for a stopping loop to exit, by default.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Default)]
struct HostState {
    thread: Option<JoinHandle<()>>,
    /// `stop` was signalled but the thread may not have exited yet.
    stopping: bool,
}

pub struct ServiceHost<L: NativeLoop, C: StatusChannel> {
    native: Arc<L>,
    status: C,
    channel: ChannelSpec,
    title: String,
    thread_name: String,
    stop_grace: Duration,
    state: Mutex<HostState>,
}

impl<L: NativeLoop, C: StatusChannel> ServiceHost<L, C> {
    pub fn new(native: L, status: C, channel: ChannelSpec) -> Self {
        Self {
            native: Arc::new(native),
            status,
            title: channel.name.clone(),
            thread_name: format!("{}-loop", channel.id),
            channel,
            stop_grace: DEFAULT_STOP_GRACE,
            state: Mutex::new(HostState::default()),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn native(&self) -> &L {
        &self.native
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the loop on a dedicated thread. Starting a running service is a no-op.
    ///
    /// If a previous loop was stopped but has not exited yet, waits up to the
    /// stop grace for it and fails with `StillStopping` otherwise. At most one
    /// loop thread is ever alive.
    pub fn start(&self) -> Result<(), ServiceError> {
        let mut state = self.lock();
        if let Some(previous) = state.thread.take() {
            if !previous.is_finished() && !state.stopping {
                debug!(channel = %self.channel.id, "service already running");
                state.thread = Some(previous);
                return Ok(());
            }
            if !self.wait_for_exit(&previous) {
                state.thread = Some(previous);
                return Err(ServiceError::StillStopping(self.stop_grace));
            }
            if previous.join().is_err() {
                debug!("previous native loop panicked");
            }
        }
        state.stopping = false;

        // check-then-create, serialized by the host lock
        self.ensure_channel()?;
        self.status
            .post(&self.channel.id, &StatusNotice::ongoing(&self.title, "Running"))?;

        let native = Arc::clone(&self.native);
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || match native.run() {
                Ok(()) => info!("native loop returned"),
                Err(e) => error!(error = %e, "native loop failed"),
            })
            .map_err(ServiceError::Spawn)?;

        state.thread = Some(handle);
        info!(thread = %self.thread_name, "service started");
        Ok(())
    }

    fn wait_for_exit(&self, thread: &JoinHandle<()>) -> bool {
        let deadline = Instant::now() + self.stop_grace;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }

    fn ensure_channel(&self) -> Result<(), ServiceError> {
        if self.status.channel_exists(&self.channel.id) {
            return Ok(());
        }
        self.status.create_channel(&self.channel)?;
        debug!(channel = %self.channel.id, "status channel created");
        Ok(())
    }

    /// Signal the loop to stop. Never fails; the loop thread is not joined.
    pub fn stop(&self) {
        {
            let mut state = self.lock();
            if state.thread.is_none() || state.stopping {
                return;
            }
            state.stopping = true;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.native.stop())) {
            Ok(Ok(())) => debug!("native loop signalled to stop"),
            Ok(Err(e)) => debug!(error = %e, "native stop failed; ignoring"),
            Err(_) => debug!("native stop panicked; ignoring"),
        }
        self.status.clear(&self.channel.id);
        info!(thread = %self.thread_name, "service stopped");
    }

    pub fn is_running(&self) -> bool {
        let state = self.lock();
        !state.stopping && state.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl<L: NativeLoop, C: StatusChannel> Drop for ServiceHost<L, C> {
    fn drop(&mut self) {
        self.stop();
    }
}
