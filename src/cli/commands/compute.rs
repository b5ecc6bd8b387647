// CPU負荷の計算コマンド: 総和・重い計算・行列積

use super::Comparison;
use crate::engine::{parallel_sum, sequential_sum};
use crate::workloads::{heavy_input, heavy_sum_parallel, heavy_sum_sequential, Matrix};
use anyhow::{bail, Result};
use std::time::Instant;

pub fn measure_sum(len: usize, workers: usize) -> Result<Comparison> {
    let data: Vec<u64> = (0..len as u64).collect();

    let start = Instant::now();
    let expected = sequential_sum(&data, |v| *v);
    let sequential = start.elapsed();

    let start = Instant::now();
    let actual: u64 = parallel_sum(&data, workers, |v| *v)?;
    let parallel = start.elapsed();

    if actual != expected {
        bail!("総和が一致しません: sequential={expected}, parallel={actual}");
    }
    Ok(Comparison::new("sum", workers, sequential, parallel))
}

pub fn measure_heavy(len: usize, workers: usize) -> Result<Comparison> {
    let data = heavy_input(len);

    let start = Instant::now();
    let expected = heavy_sum_sequential(&data);
    let sequential = start.elapsed();

    let start = Instant::now();
    let actual = heavy_sum_parallel(&data, workers)?;
    let parallel = start.elapsed();

    // 加算順序の違いによる丸め誤差は許容する
    if (actual - expected).abs() > 1e-6 * expected.abs().max(1.0) {
        bail!("計算結果が一致しません: sequential={expected}, parallel={actual}");
    }
    Ok(Comparison::new("heavy computation", workers, sequential, parallel))
}

pub fn measure_matrix(size: usize, workers: usize) -> Result<Comparison> {
    let a = Matrix::from_fn(size, size, |i, j| (i + j) as f64);
    let b = Matrix::from_fn(size, size, |i, j| (i * j % 7) as f64);

    let start = Instant::now();
    let expected = a.multiply(&b)?;
    let sequential = start.elapsed();

    let start = Instant::now();
    let actual = a.multiply_parallel(&b, workers)?;
    let parallel = start.elapsed();

    if actual.max_abs_diff(&expected) > 1e-9 {
        bail!("行列積が一致しません");
    }
    Ok(Comparison::new(
        format!("matrix {size}x{size}"),
        workers,
        sequential,
        parallel,
    ))
}

/// sum コマンド
pub fn execute_sum(len: usize, workers: usize) -> Result<()> {
    println!("➕ 総和: {len} 要素");
    measure_sum(len, workers)?.print();
    Ok(())
}

/// heavy コマンド
pub fn execute_heavy(len: usize, workers: usize) -> Result<()> {
    println!("🧮 重い計算: {len} 要素 (sin·cos + sqrt を50回反復)");
    measure_heavy(len, workers)?.print();
    Ok(())
}

/// matrix コマンド
pub fn execute_matrix(size: usize, workers: usize) -> Result<()> {
    println!("🔢 行列積: {size}x{size}");
    measure_matrix(size, workers)?.print();
    Ok(())
}
