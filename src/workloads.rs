// ワークロード - デモでエンジンに投入する計算
//
// 重い三角関数計算、遅延付きの二乗ジョブ、密行列の積

use crate::core::{handler_fn, EngineError, EngineResult, JobHandler, WorkItem};
use crate::engine::{parallel_map_partitions, parallel_sum, sequential_sum};
use anyhow::{anyhow, Result};
use std::time::Duration;

/// heavy_computation の反復回数
pub const HEAVY_ITERATIONS: usize = 50;

/// CPU負荷の高い計算: `r = sin(r)·cos(r) + sqrt(|r| + 1)` を反復
pub fn heavy_computation(value: f64) -> f64 {
    let mut result = value;
    for _ in 0..HEAVY_ITERATIONS {
        result = result.sin() * result.cos() + (result.abs() + 1.0).sqrt();
    }
    result
}

/// `i * 0.001` の入力列
pub fn heavy_input(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64 * 0.001).collect()
}

pub fn heavy_sum_sequential(data: &[f64]) -> f64 {
    sequential_sum(data, |v| heavy_computation(*v))
}

pub fn heavy_sum_parallel(data: &[f64], workers: usize) -> EngineResult<f64> {
    parallel_sum(data, workers, |v| heavy_computation(*v))
}

/// 行優先の密行列
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_fn<F>(rows: usize, cols: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> f64,
    {
        let data = (0..rows)
            .flat_map(|i| (0..cols).map(move |j| (i, j)))
            .map(|(i, j)| f(i, j))
            .collect();
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    fn check_dimensions(&self, other: &Matrix) -> EngineResult<()> {
        if self.cols != other.rows {
            return Err(EngineError::validation(
                "matrix",
                format!(
                    "{}x{} と {}x{} は乗算できません",
                    self.rows, self.cols, other.rows, other.cols
                ),
            ));
        }
        Ok(())
    }

    /// `[start, end)` 行分の積を計算する（i-k-j 順）
    fn multiply_rows(&self, other: &Matrix, start: usize, end: usize) -> Vec<f64> {
        let mut block = vec![0.0; (end - start) * other.cols];
        for i in start..end {
            let out = &mut block[(i - start) * other.cols..(i - start + 1) * other.cols];
            for (k, &a) in self.row(i).iter().enumerate() {
                for (cell, &b) in out.iter_mut().zip(other.row(k)) {
                    *cell += a * b;
                }
            }
        }
        block
    }

    /// 逐次実行のベースライン
    pub fn multiply(&self, other: &Matrix) -> EngineResult<Matrix> {
        self.check_dimensions(other)?;
        Ok(Matrix {
            rows: self.rows,
            cols: other.cols,
            data: self.multiply_rows(other, 0, self.rows),
        })
    }

    /// 行パーティションごとに別スレッドで計算し、パーティション順に連結する
    pub fn multiply_parallel(&self, other: &Matrix, workers: usize) -> EngineResult<Matrix> {
        self.check_dimensions(other)?;

        let blocks = parallel_map_partitions(self.rows, workers, |part| {
            self.multiply_rows(other, part.start, part.end)
        })?;

        let mut data = Vec::with_capacity(self.rows * other.cols);
        for (_, block) in blocks {
            data.extend(block);
        }
        Ok(Matrix {
            rows: self.rows,
            cols: other.cols,
            data,
        })
    }

    /// 要素ごとの差の最大値
    pub fn max_abs_diff(&self, other: &Matrix) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

/// ジョブIDから決まる疑似的な処理時間（0..max_ms）
pub fn simulated_latency(job_id: u64, max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(job_id.wrapping_mul(37) % max_ms)
}

/// 遅延付きの二乗ジョブ。オーバーフローはジョブ単体の失敗として返す。
pub async fn square_job(job_id: u64, value: i64, max_latency_ms: u64) -> Result<i64> {
    tokio::time::sleep(simulated_latency(job_id, max_latency_ms)).await;
    value
        .checked_mul(value)
        .ok_or_else(|| anyhow!("{value}^2 がオーバーフローしました"))
}

/// square_job を実行する JobHandler
pub fn square_handler(max_latency_ms: u64) -> impl JobHandler<i64, i64> {
    handler_fn(move |job_id, value: i64| square_job(job_id, value, max_latency_ms))
}

/// ID 1..=count、値 = ID のジョブ列
pub fn square_jobs(count: u64) -> Vec<WorkItem<i64>> {
    (1..=count).map(|id| WorkItem::new(id, id as i64)).collect()
}

/// ワーカープールと比較するための逐次実行
pub async fn square_jobs_sequential(jobs: &[WorkItem<i64>], max_latency_ms: u64) -> Vec<Result<i64>> {
    let mut outputs = Vec::with_capacity(jobs.len());
    for job in jobs {
        outputs.push(square_job(job.id, job.payload, max_latency_ms).await);
    }
    outputs
}
