//! cadence-core
//!
//! A self-perpetuating, externally-paced task scheduler.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, delay, job, outcome, chain state）
//! - **ports**: 抽象化レイヤー（TaskQueue, EnvironmentOracle, SyncEngine）
//! - **chain**: BootstrapTask / RecurringSyncTask / ExecutionGuard / Trigger / ChainMonitor
//! - **app**: ChainRuntime と builder
//! - **queue**: ホスト側キューのインメモリ実装（TaskSource, TaskLease, InMemoryQueue）
//! - **worker**: lease → execute → complete ループ
//! - **service**: 代替モード（常駐ループの start/stop）
//! - **config**: TOML 設定
//!
//! A trigger enqueues the bootstrap task under a dedup key. The bootstrap asks
//! the oracle for an initial delay and schedules the first sync. Every sync
//! run asks the engine for the next delay (24h fallback when it has no
//! positive answer) and schedules its own successor. A failed run reports
//! `Retry` and schedules nothing; retrying is the host queue's job.

pub mod app;
pub mod chain;
pub mod config;
pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod service;
pub mod worker;

pub use app::{BuildError, ChainRuntime, ChainRuntimeBuilder};
pub use chain::{ChainMonitor, ChainPolicy, ChainStatus, ExecutionGuard, Trigger};
pub use config::{ChainConfig, ConfigError};
pub use domain::{ChainJob, DelaySeconds, ExistingPolicy, TaskOutcome};
pub use error::{BoundaryError, ChainError};
pub use worker::WorkerGroup;
