// 進捗監視の具象実装

use crate::core::{ProgressReporter, RunSummary, StreamEnd, WorkerExit};
use async_trait::async_trait;

/// コンソール出力による進捗報告実装
#[derive(Debug, Default, Clone)]
pub struct ConsoleProgressReporter {
    quiet: bool,
}

impl ConsoleProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    /// 進捗を表示する間隔（全体の約10%ごと）
    fn should_report(completed: usize, total: usize) -> bool {
        let step = (total / 10).max(1);
        completed % step == 0 || completed == total
    }
}

#[async_trait]
impl ProgressReporter for ConsoleProgressReporter {
    async fn report_started(&self, total_jobs: usize) {
        if !self.quiet {
            println!("🚀 Starting {total_jobs} jobs...");
        }
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        if !self.quiet && total > 0 && Self::should_report(completed, total) {
            let percentage = (completed as f64 / total as f64) * 100.0;
            println!("📊 Progress: {completed}/{total} ({percentage:.1}%)");
        }
    }

    async fn report_error(&self, job_id: u64, error: &str) {
        if !self.quiet {
            eprintln!("❌ Job {job_id} failed: {error}");
        }
    }

    async fn report_worker_started(&self, worker_id: usize) {
        if !self.quiet {
            println!("👷 Worker {worker_id} started");
        }
    }

    async fn report_worker_exit(&self, worker_id: usize, exit: WorkerExit) {
        if self.quiet {
            return;
        }
        match exit {
            WorkerExit::Drained | WorkerExit::Disconnected => {}
            WorkerExit::Cancelled => println!("⏹️  Worker {worker_id} stopped by cancellation"),
            WorkerExit::Panicked => eprintln!("💥 Worker {worker_id} panicked"),
        }
    }

    async fn report_completed(&self, summary: &RunSummary) {
        if self.quiet {
            return;
        }
        match summary.termination {
            StreamEnd::Completed => println!(
                "✅ Completed! Jobs: {}, Failed: {}, Time: {}ms",
                summary.total_jobs, summary.failed, summary.total_time_ms
            ),
            StreamEnd::Cancelled(reason) => println!(
                "⏹️  Stopped early ({reason}) after {} jobs, Failed: {}, Time: {}ms",
                summary.total_jobs, summary.failed, summary.total_time_ms
            ),
            StreamEnd::Aborted => eprintln!(
                "⚠️  Aborted after {} jobs, Failed: {}, Time: {}ms",
                summary.total_jobs, summary.failed, summary.total_time_ms
            ),
        }
    }
}

/// 何もしない進捗報告実装（テスト・ベンチマーク用）
#[derive(Debug, Default, Clone)]
pub struct NoOpProgressReporter;

impl NoOpProgressReporter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProgressReporter for NoOpProgressReporter {
    async fn report_started(&self, _total_jobs: usize) {
        // 何もしない
    }

    async fn report_progress(&self, _completed: usize, _total: usize) {
        // 何もしない
    }

    async fn report_error(&self, _job_id: u64, _error: &str) {
        // 何もしない
    }

    async fn report_worker_started(&self, _worker_id: usize) {
        // 何もしない
    }

    async fn report_worker_exit(&self, _worker_id: usize, _exit: WorkerExit) {
        // 何もしない
    }

    async fn report_completed(&self, _summary: &RunSummary) {
        // 何もしない
    }
}
