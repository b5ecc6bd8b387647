// Bounded Worker Pool - 固定数ワーカーによる共有ジョブキューの消化
//
// ワーカーは生成時にまとめて起動し、共有キューから先着でジョブを取得する。
// 結果ストリームは監督タスクが全ワーカーの終了を待ってからクローズする。

use super::context::CancellationContext;
use super::producer::spawn_producer;
use super::stream::{self, Recv, SharedReceiver, StreamProducer, StreamReceiver, StreamSender};
use crate::core::{
    CancelReason, EngineConfig, EngineError, EngineResult, JobHandler, JobOutcome, JobResult,
    PoolReport, PoolState, ProgressReporter, StreamEnd, WorkItem, WorkerExit,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 状態を前方向にのみ進める
fn advance(state: &watch::Sender<PoolState>, next: PoolState) {
    state.send_if_modified(|current| {
        if *current < next {
            *current = next;
            true
        } else {
            false
        }
    });
}

/// ジョブ投入ハンドル。クローンして複数のProducerから使える。
pub struct JobSubmitter<I> {
    inner: Arc<SubmitterInner<I>>,
}

struct SubmitterInner<I> {
    jobs: Mutex<Option<StreamSender<WorkItem<I>>>>,
    state: watch::Sender<PoolState>,
    ctx: CancellationContext,
}

impl<I> Clone for JobSubmitter<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I> JobSubmitter<I> {
    /// ジョブを投入する。キューが満杯なら空きが出るまで待機。
    ///
    /// クローズ後は `PoolClosed`、キャンセル後は `Cancelled` を返す
    pub async fn submit(&self, item: WorkItem<I>) -> EngineResult<()> {
        self.inner.ctx.check("submit")?;

        let producer = {
            let guard = self
                .inner
                .jobs
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match guard.as_ref() {
                Some(jobs) => jobs.producer(),
                None => return Err(EngineError::pool_closed(item.id)),
            }
        };

        producer.send(item, &self.inner.ctx).await
    }

    /// これ以上ジョブを投入しないことを通知する
    ///
    /// 2回目以降の呼び出しは何もせず false を返す
    pub fn close(&self) -> bool {
        let jobs = self
            .inner
            .jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        match jobs {
            Some(jobs) => {
                jobs.close(StreamEnd::Completed);
                advance(&self.inner.state, PoolState::Draining);
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

/// 生存ワーカー数を終了時（パニック含む）に減らすガード
struct AliveGuard(Arc<AtomicUsize>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 単一ワーカーのループ
///
/// キャンセルはジョブとジョブの間でのみ確認する
#[allow(clippy::too_many_arguments)]
async fn run_worker<I, O, H, R>(
    worker_id: usize,
    jobs: SharedReceiver<WorkItem<I>>,
    results: StreamProducer<JobResult<O>>,
    handler: Arc<H>,
    ctx: CancellationContext,
    processed: Arc<AtomicUsize>,
    alive: AliveGuard,
    reporter: Arc<R>,
) -> WorkerExit
where
    I: Send + 'static,
    O: Send + 'static,
    H: JobHandler<I, O> + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let _alive = alive;
    reporter.report_worker_started(worker_id).await;
    loop {
        let item = match jobs.claim(&ctx).await {
            Recv::Value(item) => item,
            Recv::Closed(_) => return WorkerExit::Drained,
            Recv::Cancelled(_) => return WorkerExit::Cancelled,
        };

        let started = Instant::now();
        let outcome = match handler.handle(item.id, item.payload).await {
            Ok(output) => JobOutcome::Success(output),
            Err(error) => JobOutcome::Failed(format!("{error:#}")),
        };
        let result = JobResult {
            job_id: item.id,
            worker_id,
            outcome,
            elapsed: started.elapsed(),
        };

        match results.send(result, &ctx).await {
            Ok(()) => {
                processed.fetch_add(1, Ordering::SeqCst);
            }
            Err(error) if error.is_cancelled() => return WorkerExit::Cancelled,
            // 結果の受信側が消えた場合は終了
            Err(_) => return WorkerExit::Disconnected,
        }
    }
}

/// 有界ワーカープール
pub struct WorkerPool<I, O> {
    submitter: JobSubmitter<I>,
    results: Option<StreamReceiver<JobResult<O>>>,
    supervisor: Option<JoinHandle<PoolReport>>,
    state: watch::Receiver<PoolState>,
    alive: Arc<AtomicUsize>,
    worker_count: usize,
    ctx: CancellationContext,
}

impl<I, O> WorkerPool<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// 設定に従ってワーカーを起動する
    ///
    /// tokio ランタイム内から呼び出すこと
    pub fn start<C, H, R>(
        config: &C,
        handler: H,
        ctx: CancellationContext,
        reporter: Arc<R>,
    ) -> EngineResult<Self>
    where
        C: EngineConfig + ?Sized,
        H: JobHandler<I, O> + 'static,
        R: ProgressReporter + 'static,
    {
        let worker_count = config.worker_count();
        if worker_count == 0 {
            return Err(EngineError::configuration(
                "ワーカー数は1以上である必要があります",
            ));
        }
        if config.queue_capacity() == 0 {
            return Err(EngineError::configuration(
                "キュー容量は1以上である必要があります",
            ));
        }

        let (state_tx, state_rx) = watch::channel(PoolState::Created);
        let (jobs_tx, jobs_rx) = stream::bounded("jobs", config.queue_capacity());
        let (results_tx, results_rx) = stream::bounded("results", config.queue_capacity());

        let jobs_rx = jobs_rx.shared();
        let handler = Arc::new(handler);
        let alive = Arc::new(AtomicUsize::new(worker_count));
        let processed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            handles.push(tokio::spawn(run_worker(
                worker_id,
                jobs_rx.clone(),
                results_tx.producer(),
                Arc::clone(&handler),
                ctx.clone(),
                Arc::clone(&processed),
                AliveGuard(Arc::clone(&alive)),
                Arc::clone(&reporter),
            )));
        }
        drop(jobs_rx);
        advance(&state_tx, PoolState::Running);

        let submitter = JobSubmitter {
            inner: Arc::new(SubmitterInner {
                jobs: Mutex::new(Some(jobs_tx)),
                state: state_tx,
                ctx: ctx.clone(),
            }),
        };

        let supervisor = tokio::spawn(supervise(
            handles,
            results_tx,
            submitter.clone(),
            ctx.clone(),
            processed,
            reporter,
        ));

        Ok(Self {
            submitter,
            results: Some(results_rx),
            supervisor: Some(supervisor),
            state: state_rx,
            alive,
            worker_count,
            ctx,
        })
    }

    /// ジョブを投入する
    pub async fn submit(&self, item: WorkItem<I>) -> EngineResult<()> {
        self.submitter.submit(item).await
    }

    /// 有限のジョブ列を別タスクで投入し、投入後にプールを締め切る
    pub fn submit_all(&self, items: Vec<WorkItem<I>>) -> JoinHandle<EngineResult<usize>> {
        spawn_producer(items, self.submitter())
    }

    /// 別タスクから投入するためのハンドル
    pub fn submitter(&self) -> JobSubmitter<I> {
        self.submitter.clone()
    }

    /// ジョブ投入を締め切る（冪等）
    pub fn close(&self) -> bool {
        self.submitter.close()
    }

    /// 結果ストリームを取得する（1回のみ）
    ///
    /// 最後まで受信し切ることがプール完了を知る唯一の正しい方法
    pub fn results(&mut self) -> EngineResult<StreamReceiver<JobResult<O>>> {
        self.results
            .take()
            .ok_or_else(|| EngineError::channel("結果ストリームは既に取得されています"))
    }

    pub fn state(&self) -> PoolState {
        *self.state.borrow()
    }

    /// 生存しているワーカー数
    pub fn alive_workers(&self) -> usize {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn context(&self) -> &CancellationContext {
        &self.ctx
    }

    /// 監督タスクの完了を待ち、停止レポートを返す
    ///
    /// 投入を締め切り、未取得の結果ストリームは破棄してから待機する
    pub async fn join(mut self) -> EngineResult<PoolReport> {
        self.submitter.close();
        self.results.take();

        match self.supervisor.take() {
            Some(supervisor) => Ok(supervisor.await?),
            None => Err(EngineError::channel("監督タスクは既に回収されています")),
        }
    }
}

impl<I, O> Drop for WorkerPool<I, O> {
    /// 破棄されたプールは投入を締め切り、ワーカーにキュー終端を知らせる
    fn drop(&mut self) {
        self.submitter.close();
    }
}

/// 監督タスク: 全ワーカーの終了を待ってから結果ストリームをクローズする
async fn supervise<I, O, R>(
    handles: Vec<JoinHandle<WorkerExit>>,
    results: StreamSender<JobResult<O>>,
    submitter: JobSubmitter<I>,
    ctx: CancellationContext,
    processed: Arc<AtomicUsize>,
    reporter: Arc<R>,
) -> PoolReport
where
    R: ProgressReporter + 'static,
{
    let mut report = PoolReport {
        workers_started: handles.len(),
        ..Default::default()
    };

    for (worker_id, handle) in handles.into_iter().enumerate() {
        let exit = handle.await.unwrap_or(WorkerExit::Panicked);
        match exit {
            WorkerExit::Drained | WorkerExit::Disconnected => report.workers_drained += 1,
            WorkerExit::Cancelled => report.workers_cancelled += 1,
            WorkerExit::Panicked => report.workers_panicked += 1,
        }
        reporter.report_worker_exit(worker_id, exit).await;
    }
    report.jobs_processed = processed.load(Ordering::SeqCst);

    let end = if report.workers_cancelled > 0 {
        StreamEnd::Cancelled(ctx.reason().unwrap_or(CancelReason::Cancelled))
    } else if report.workers_panicked > 0 {
        StreamEnd::Aborted
    } else {
        StreamEnd::Completed
    };
    results.close(end);

    // ワーカー不在のまま投入を受け付けないよう締め切る
    submitter.close();
    advance(&submitter.inner.state, PoolState::Stopped);
    report
}
