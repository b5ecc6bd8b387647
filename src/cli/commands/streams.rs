// pipeline / fan コマンド: ストリーム段の連結と分配・合流

use crate::core::EngineConfig;
use crate::engine::{CancellationContext, Pipeline};
use crate::services::DefaultEngineConfig;
use anyhow::Result;

/// 生成 → 二乗 → 10より大きい値のみ
pub async fn square_and_filter(count: u64, buffer: usize) -> Result<Vec<u64>> {
    let ctx = CancellationContext::new();
    let output = Pipeline::from_iter(1..=count, buffer, &ctx)
        .map(|n| n * n)
        .filter(|n| *n > 10)
        .collect()
        .await?;
    Ok(output)
}

/// 生成 → 競合ワーカーで二乗 → 合流。順序は不定。
pub async fn fan_out_squares(count: u64, workers: usize, buffer: usize) -> Result<Vec<(u64, u64)>> {
    let ctx = CancellationContext::new();
    let output = Pipeline::from_iter(1..=count, buffer, &ctx)
        .fan_out(workers, |n| async move { (n, n * n) })?
        .collect()
        .await?;
    Ok(output)
}

/// pipeline コマンド
pub async fn execute_pipeline(count: u64, config: &DefaultEngineConfig) -> Result<()> {
    println!("=== Pipeline: generate → square → filter(> 10) ===");
    let output = square_and_filter(count, config.stage_buffer_size()).await?;
    for value in &output {
        println!("  {value}");
    }
    println!("📊 {} / {count} 件が通過", output.len());
    Ok(())
}

/// fan コマンド
pub async fn execute_fan(count: u64, config: &DefaultEngineConfig) -> Result<()> {
    println!(
        "=== Fan-out / Fan-in: {} workers ===",
        config.worker_count()
    );
    let output = fan_out_squares(count, config.worker_count(), config.stage_buffer_size()).await?;
    for (value, square) in &output {
        println!("  {value}^2 = {square}");
    }
    println!("📊 {} 件を合流", output.len());
    Ok(())
}
