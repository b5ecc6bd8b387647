// テスト用の報告記録実装

use async_trait::async_trait;
use parallel_engine::core::{ProgressReporter, RunSummary, WorkerExit};
use std::sync::Mutex;

/// 呼び出し内容を記録する ProgressReporter
#[derive(Debug, Default)]
pub struct RecordingReporter {
    started: Mutex<Option<usize>>,
    progress: Mutex<Vec<(usize, usize)>>,
    errors: Mutex<Vec<(u64, String)>>,
    worker_starts: Mutex<Vec<usize>>,
    exits: Mutex<Vec<(usize, WorkerExit)>>,
    completed: Mutex<Option<RunSummary>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> Option<usize> {
        *self.started.lock().unwrap()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(u64, String)> {
        self.errors.lock().unwrap().clone()
    }

    pub fn worker_starts(&self) -> Vec<usize> {
        self.worker_starts.lock().unwrap().clone()
    }

    pub fn exits(&self) -> Vec<(usize, WorkerExit)> {
        self.exits.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Option<RunSummary> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressReporter for RecordingReporter {
    async fn report_started(&self, total_jobs: usize) {
        *self.started.lock().unwrap() = Some(total_jobs);
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        self.progress.lock().unwrap().push((completed, total));
    }

    async fn report_error(&self, job_id: u64, error: &str) {
        self.errors.lock().unwrap().push((job_id, error.to_string()));
    }

    async fn report_worker_started(&self, worker_id: usize) {
        self.worker_starts.lock().unwrap().push(worker_id);
    }

    async fn report_worker_exit(&self, worker_id: usize, exit: WorkerExit) {
        self.exits.lock().unwrap().push((worker_id, exit));
    }

    async fn report_completed(&self, summary: &RunSummary) {
        *self.completed.lock().unwrap() = Some(summary.clone());
    }
}
