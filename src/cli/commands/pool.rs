// pool コマンド: 遅延付き二乗ジョブをワーカープールで処理

use super::{console_reporter, Comparison};
use crate::core::{EngineConfig, JobResult, ProgressReporter};
use crate::engine::{collect_results, CancellationContext, Collected, WorkerPool};
use crate::services::DefaultEngineConfig;
use crate::workloads::{square_handler, square_jobs, square_jobs_sequential};
use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Instant;

/// ジョブ列をプールで最後まで処理する
pub async fn run_square_pool<R>(
    jobs: u64,
    max_latency_ms: u64,
    config: &DefaultEngineConfig,
    reporter: Arc<R>,
) -> Result<Collected<i64>>
where
    R: ProgressReporter + 'static,
{
    let items = square_jobs(jobs);
    let total = items.len();

    let mut pool = WorkerPool::start(
        config,
        square_handler(max_latency_ms),
        CancellationContext::new(),
        Arc::clone(&reporter),
    )?;
    let results = pool.results()?;

    reporter.report_started(total).await;
    let producer_handle = pool.submit_all(items);
    let collected = collect_results(results, total, reporter.as_ref()).await;

    producer_handle.await??;
    let report = pool.join().await?;

    if !report.is_clean() {
        bail!("ワーカーが異常終了しました: {report:?}");
    }
    Ok(collected)
}

pub async fn measure_pool(jobs: u64, max_latency_ms: u64, config: &DefaultEngineConfig, quiet: bool) -> Result<Comparison> {
    let items = square_jobs(jobs);

    let start = Instant::now();
    square_jobs_sequential(&items, max_latency_ms).await;
    let sequential = start.elapsed();

    let start = Instant::now();
    let reporter = Arc::new(console_reporter(config, quiet));
    let collected = run_square_pool(jobs, max_latency_ms, config, reporter).await?;
    let parallel = start.elapsed();

    if collected.results.len() != items.len() {
        bail!(
            "結果数が一致しません: expected={}, actual={}",
            items.len(),
            collected.results.len()
        );
    }
    Ok(Comparison::new(
        "worker pool",
        config.worker_count(),
        sequential,
        parallel,
    ))
}

fn print_result(result: &JobResult<i64>) {
    match (result.output(), result.error()) {
        (Some(output), _) => println!(
            "  Job {:2}: {}^2 = {:3} (Worker {})",
            result.job_id, result.job_id, output, result.worker_id
        ),
        (None, Some(error)) => println!(
            "  Job {:2}: failed: {error} (Worker {})",
            result.job_id, result.worker_id
        ),
        (None, None) => {}
    }
}

/// pool コマンド
pub async fn execute_pool(
    jobs: u64,
    max_latency_ms: u64,
    config: &DefaultEngineConfig,
    quiet: bool,
) -> Result<()> {
    println!("=== Worker Pool ===");
    println!("📋 ジョブ数: {jobs}");
    println!("👷 ワーカー数: {}", config.worker_count());

    let reporter = Arc::new(console_reporter(config, quiet));
    let collected = run_square_pool(jobs, max_latency_ms, config, reporter).await?;

    let mut results = collected.results;
    results.sort_by_key(|result| result.job_id);
    println!("\n結果:");
    for result in &results {
        print_result(result);
    }

    let summary = collected.summary;
    println!("\n📊 合計時間: {}ms", summary.total_time_ms);
    println!(
        "📊 平均処理時間: {:.2}ms/ジョブ",
        summary.average_time_per_job_ms
    );
    Ok(())
}
