//! Ports - 外部コラボレータの抽象化
//!
//! ホスト側のタスクキューと、中身を知らない計算境界（oracle / engine）を
//! trait として定義します。チェーンのスケジューリングはこれらの trait
//! にだけ依存するので、インメモリ実装やテスト用 fake で検証できます。

pub mod boundary;
pub mod task_queue;

pub use self::boundary::{EnvironmentOracle, SyncEngine};
pub use self::task_queue::{EnqueueResult, QueueError, TaskQueue};
