// 並列実行エンジンのトレイト定義
// 外部の協調者（設定・進捗報告・ジョブ処理）との境界を抽象化

use super::types::{RunSummary, WorkerExit};
use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use std::future::Future;

/// エンジンの設定を抽象化するトレイト
#[automock]
pub trait EngineConfig: Send + Sync {
    /// ワーカー数（パーティション数）を取得
    fn worker_count(&self) -> usize;

    /// ジョブキューの容量を取得
    fn queue_capacity(&self) -> usize;

    /// パイプライン各段の間のバッファサイズを取得
    fn stage_buffer_size(&self) -> usize;

    /// 進捗報告を有効にするかどうか
    fn enable_progress_reporting(&self) -> bool;
}

// EngineConfig for Box<dyn EngineConfig>
impl EngineConfig for Box<dyn EngineConfig> {
    fn worker_count(&self) -> usize {
        self.as_ref().worker_count()
    }

    fn queue_capacity(&self) -> usize {
        self.as_ref().queue_capacity()
    }

    fn stage_buffer_size(&self) -> usize {
        self.as_ref().stage_buffer_size()
    }

    fn enable_progress_reporting(&self) -> bool {
        self.as_ref().enable_progress_reporting()
    }
}

/// 進捗報告の抽象化トレイト
#[automock]
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// 処理開始時の報告
    async fn report_started(&self, total_jobs: usize);

    /// 進捗更新の報告
    async fn report_progress(&self, completed: usize, total: usize);

    /// ジョブ失敗時の報告
    async fn report_error(&self, job_id: u64, error: &str);

    /// ワーカー起動時の報告
    async fn report_worker_started(&self, worker_id: usize);

    /// ワーカー終了時の報告
    async fn report_worker_exit(&self, worker_id: usize, exit: WorkerExit);

    /// 処理完了時の報告
    async fn report_completed(&self, summary: &RunSummary);
}

// ProgressReporter for Box<dyn ProgressReporter>
#[async_trait]
impl ProgressReporter for Box<dyn ProgressReporter> {
    async fn report_started(&self, total_jobs: usize) {
        self.as_ref().report_started(total_jobs).await
    }

    async fn report_progress(&self, completed: usize, total: usize) {
        self.as_ref().report_progress(completed, total).await
    }

    async fn report_error(&self, job_id: u64, error: &str) {
        self.as_ref().report_error(job_id, error).await
    }

    async fn report_worker_started(&self, worker_id: usize) {
        self.as_ref().report_worker_started(worker_id).await
    }

    async fn report_worker_exit(&self, worker_id: usize, exit: WorkerExit) {
        self.as_ref().report_worker_exit(worker_id, exit).await
    }

    async fn report_completed(&self, summary: &RunSummary) {
        self.as_ref().report_completed(summary).await
    }
}

/// ワーカープールが実行するジョブ処理の抽象化トレイト
///
/// `Err` はジョブ単体の失敗として結果に記録され、ワーカーは処理を継続する
#[async_trait]
pub trait JobHandler<I: Send + 'static, O: Send + 'static>: Send + Sync {
    async fn handle(&self, job_id: u64, payload: I) -> Result<O>;
}

/// クロージャを JobHandler として扱うアダプタ
pub struct FnHandler<F> {
    f: F,
}

/// `Fn(u64, I) -> Future<Output = Result<O>>` から JobHandler を作成
pub fn handler_fn<I, O, F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(u64, I) -> Fut,
    Fut: Future<Output = Result<O>>,
{
    FnHandler { f }
}

#[async_trait]
impl<I, O, F, Fut> JobHandler<I, O> for FnHandler<F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(u64, I) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send,
{
    async fn handle(&self, job_id: u64, payload: I) -> Result<O> {
        (self.f)(job_id, payload).await
    }
}
