//! 並列実行エンジン
//!
//! - パーティション分割による並列リダクション
//! - 有界ワーカープール
//! - パイプライン段の連結
//! - Fan-Out/Fan-In
//! - デッドライン付きの協調的キャンセル

pub mod cli;
pub mod core;
pub mod engine;
pub mod services;
pub mod workloads;

// 公開API - よく使う型をクレートルートから参照できるようにする
pub use crate::core::{
    EngineConfig, EngineError, EngineResult, JobHandler, JobResult, PoolState, ProgressReporter,
    StreamEnd, WorkItem,
};
pub use crate::engine::{CancellationContext, Pipeline, WorkerPool};
pub use crate::services::{ConfigPreset, ConsoleProgressReporter, DefaultEngineConfig, NoOpProgressReporter};
