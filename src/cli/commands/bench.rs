// bench コマンド: 逐次実行と並列実行の比較表

use super::{measure_heavy, measure_matrix, measure_pool, Comparison};
use crate::core::EngineConfig;
use crate::services::DefaultEngineConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// ベンチマーク入力の大きさ
#[derive(Debug, Clone, Copy)]
pub struct BenchSizes {
    pub heavy_len: usize,
    pub matrix_sizes: [usize; 2],
    pub pool_jobs: u64,
    pub pool_latency_ms: u64,
}

impl BenchSizes {
    pub fn full() -> Self {
        Self {
            heavy_len: 500_000,
            matrix_sizes: [256, 512],
            pool_jobs: 20,
            pool_latency_ms: 100,
        }
    }

    pub fn quick() -> Self {
        Self {
            heavy_len: 5_000,
            matrix_sizes: [16, 32],
            pool_jobs: 4,
            pool_latency_ms: 2,
        }
    }
}

/// JSON出力用のレポート
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub generated_at: DateTime<Utc>,
    pub cpu_count: usize,
    pub workers: usize,
    pub rows: Vec<Comparison>,
}

pub async fn run_benchmarks(sizes: BenchSizes, config: &DefaultEngineConfig) -> Result<BenchReport> {
    let workers = config.worker_count();

    let mut rows = vec![measure_heavy(sizes.heavy_len, workers)?];
    for size in sizes.matrix_sizes {
        rows.push(measure_matrix(size, workers)?);
    }
    rows.push(measure_pool(sizes.pool_jobs, sizes.pool_latency_ms, config, true).await?);

    Ok(BenchReport {
        generated_at: Utc::now(),
        cpu_count: num_cpus::get(),
        workers,
        rows,
    })
}

fn print_table(report: &BenchReport) {
    println!(
        "{:<20} {:>14} {:>14} {:>10}",
        "Benchmark", "Sequential", "Parallel", "Speedup"
    );
    println!("{}", "-".repeat(61));
    for row in &report.rows {
        println!(
            "{:<20} {:>12.2}ms {:>12.2}ms {:>9.2}x",
            row.name, row.sequential_ms, row.parallel_ms, row.speedup
        );
    }
    println!(
        "\nCPU: {}, Workers: {}, {}",
        report.cpu_count,
        report.workers,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}

/// bench コマンド
pub async fn execute_bench(
    json: bool,
    output: Option<PathBuf>,
    quick: bool,
    config: &DefaultEngineConfig,
) -> Result<()> {
    let sizes = if quick {
        BenchSizes::quick()
    } else {
        BenchSizes::full()
    };
    let report = run_benchmarks(sizes, config).await?;

    match (json, output) {
        (_, Some(path)) => {
            let content = serde_json::to_string_pretty(&report)?;
            std::fs::write(&path, content)
                .with_context(|| format!("レポートを書き込めません: {}", path.display()))?;
            println!("📄 結果は {} に保存されました", path.display());
        }
        (true, None) => println!("{}", serde_json::to_string_pretty(&report)?),
        (false, None) => print_table(&report),
    }
    Ok(())
}
