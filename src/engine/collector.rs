// Collector - 結果ストリームの消化と集計
//
// 結果ストリームを最後まで受信し切ることが完了判定の唯一の根拠。

use super::stream::StreamReceiver;
use crate::core::{JobOutcome, JobResult, ProgressReporter, RunSummary, StreamEnd};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// 消化した結果と集計
#[derive(Debug)]
pub struct Collected<O> {
    pub results: Vec<JobResult<O>>,
    pub summary: RunSummary,
}

impl<O> Collected<O> {
    /// 成功した出力のみを取り出す
    pub fn outputs(self) -> Vec<O> {
        self.results
            .into_iter()
            .filter_map(|result| match result.outcome {
                JobOutcome::Success(output) => Some(output),
                JobOutcome::Failed(_) => None,
            })
            .collect()
    }
}

/// 結果ストリームをクローズまで消化し、進捗とジョブ単位の失敗を報告する
///
/// `expected` は進捗表示の分母としてのみ使う
pub async fn collect_results<O, R>(
    mut results: StreamReceiver<JobResult<O>>,
    expected: usize,
    reporter: &R,
) -> Collected<O>
where
    R: ProgressReporter + ?Sized,
{
    let start_time = Instant::now();
    let mut collected = Vec::with_capacity(expected);
    let mut failed = 0;

    while let Some(result) = results.recv().await {
        if let Some(error) = result.error() {
            reporter.report_error(result.job_id, error).await;
            failed += 1;
        }
        collected.push(result);

        reporter
            .report_progress(collected.len(), expected.max(collected.len()))
            .await;
    }

    let total_jobs = collected.len();
    let total_time_ms = start_time.elapsed().as_millis() as u64;
    let average_time_per_job_ms = if total_jobs > 0 {
        let busy: f64 = collected
            .iter()
            .map(|result| result.elapsed.as_secs_f64() * 1000.0)
            .sum();
        busy / total_jobs as f64
    } else {
        0.0
    };

    let summary = RunSummary {
        total_jobs,
        succeeded: total_jobs - failed,
        failed,
        total_time_ms,
        average_time_per_job_ms,
        // recv() が None を返した後なので終了状態は確定している
        termination: results.end().unwrap_or(StreamEnd::Aborted),
    };
    reporter.report_completed(&summary).await;

    Collected {
        results: collected,
        summary,
    }
}

/// Collector を別タスクとして起動する
pub fn spawn_result_collector<O, R>(
    results: StreamReceiver<JobResult<O>>,
    expected: usize,
    reporter: Arc<R>,
) -> JoinHandle<Collected<O>>
where
    O: Send + 'static,
    R: ProgressReporter + ?Sized + 'static,
{
    tokio::spawn(async move { collect_results(results, expected, reporter.as_ref()).await })
}
