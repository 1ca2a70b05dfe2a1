//! App - アプリケーション層
//!
//! ports と chain を組み合わせて 1 本のチェーンを動かします。
//!
//! # 主要コンポーネント
//! - **ChainRuntimeBuilder**: 構築とワイヤリング（fail-fast）
//! - **ChainRuntime**: trigger / execute / completion の受け口

pub mod builder;
pub mod runtime;

pub use self::builder::{BuildError, ChainRuntimeBuilder};
pub use self::runtime::ChainRuntime;
