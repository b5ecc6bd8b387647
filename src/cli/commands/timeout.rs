// timeout コマンド: デッドライン付きの協調的なワーカー

use crate::core::{CancelReason, EngineConfig};
use crate::engine::{cooperative_loop, CancellationContext};
use crate::services::DefaultEngineConfig;
use anyhow::Result;
use tokio::time::{Duration, Instant};

/// ワーカーごとの完了単位数
#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutReport {
    pub units_per_worker: Vec<usize>,
    pub elapsed: Duration,
    pub reason: Option<CancelReason>,
}

/// `workers` 個のワーカーを `timeout` のデッドラインで走らせる
pub async fn run_with_deadline(
    workers: usize,
    timeout: Duration,
    unit: Duration,
    verbose: bool,
) -> Result<TimeoutReport> {
    let ctx = CancellationContext::with_timeout(timeout);
    let start = Instant::now();

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                cooperative_loop(&ctx, |step| async move {
                    tokio::time::sleep(unit).await;
                    if verbose {
                        println!("  Worker {worker_id}: unit {} done", step + 1);
                    }
                })
                .await
            })
        })
        .collect();

    let mut units_per_worker = Vec::with_capacity(workers);
    for handle in handles {
        units_per_worker.push(handle.await?);
    }

    Ok(TimeoutReport {
        units_per_worker,
        elapsed: start.elapsed(),
        reason: ctx.reason(),
    })
}

/// timeout コマンド
pub async fn execute_timeout(
    timeout_ms: u64,
    unit_ms: u64,
    config: &DefaultEngineConfig,
    quiet: bool,
) -> Result<()> {
    println!(
        "=== Context: {timeout_ms}ms deadline, {unit_ms}ms units, {} workers ===",
        config.worker_count()
    );

    let report = run_with_deadline(
        config.worker_count(),
        Duration::from_millis(timeout_ms),
        Duration::from_millis(unit_ms),
        !quiet,
    )
    .await?;

    for (worker_id, units) in report.units_per_worker.iter().enumerate() {
        println!("  Worker {worker_id}: {units} units");
    }
    match report.reason {
        Some(reason) => println!("⏹️  Stopped: {reason} after {:?}", report.elapsed),
        None => println!("✅ Finished before the deadline in {:?}", report.elapsed),
    }
    Ok(())
}
