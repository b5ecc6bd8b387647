// サブコマンドの実装
// 各コマンドは逐次実行と並列実行の時間を比較して表示する

pub mod bench;
pub mod compute;
pub mod pool;
pub mod streams;
pub mod timeout;

pub use bench::*;
pub use compute::*;
pub use pool::*;
pub use streams::*;
pub use timeout::*;

use crate::core::EngineConfig;
use crate::services::{ConfigPreset, ConsoleProgressReporter, DefaultEngineConfig};
use anyhow::Result;
use serde::Serialize;
use std::time::Duration;

/// `--preset` と `--workers` から設定を解決する
pub fn resolve_config(workers: Option<usize>, preset: Option<&str>) -> Result<DefaultEngineConfig> {
    let preset = match preset {
        Some(name) => ConfigPreset::from_name(name)?,
        None => ConfigPreset::Default,
    };

    let mut config = preset.config();
    if let Some(workers) = workers {
        config = config.with_worker_count(workers);
    }
    config.validate()?;
    Ok(config)
}

/// 設定と `--quiet` に応じた進捗報告
pub fn console_reporter<C: EngineConfig>(config: &C, quiet: bool) -> ConsoleProgressReporter {
    if quiet || !config.enable_progress_reporting() {
        ConsoleProgressReporter::quiet()
    } else {
        ConsoleProgressReporter::new()
    }
}

/// 逐次実行と並列実行の計測結果
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub name: String,
    pub workers: usize,
    pub sequential_ms: f64,
    pub parallel_ms: f64,
    pub speedup: f64,
}

impl Comparison {
    pub fn new(name: impl Into<String>, workers: usize, sequential: Duration, parallel: Duration) -> Self {
        let sequential_ms = sequential.as_secs_f64() * 1000.0;
        let parallel_ms = parallel.as_secs_f64() * 1000.0;
        let speedup = if parallel_ms > 0.0 {
            sequential_ms / parallel_ms
        } else {
            0.0
        };
        Self {
            name: name.into(),
            workers,
            sequential_ms,
            parallel_ms,
            speedup,
        }
    }

    pub fn print(&self) {
        println!("⏱️  {} ({} workers)", self.name, self.workers);
        println!("   - Sequential: {:.2}ms", self.sequential_ms);
        println!("   - Parallel:   {:.2}ms", self.parallel_ms);
        println!("   - Speedup:    {:.2}x", self.speedup);
    }
}
