// Cancellation Context - デッドライン/明示キャンセルの伝播
//
// Active → Cancelled の一方向遷移のみ。理由は最初のトリガーで確定する。
// デッドラインは tokio の時計で測るため、テストでは時計を停止・前進できる。

use crate::core::{CancelReason, EngineError, EngineResult};
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

/// 全ワーカーで共有されるキャンセルシグナル
///
/// クローンは同じシグナルを参照する。子コンテキストは親のキャンセルを必ず観測する。
#[derive(Debug, Clone)]
pub struct CancellationContext {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    deadline: Option<Instant>,
    reason: OnceLock<CancelReason>,
    signal: watch::Sender<bool>,
    children: Mutex<Vec<Weak<ContextInner>>>,
}

impl ContextInner {
    fn new(deadline: Option<Instant>) -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            deadline,
            reason: OnceLock::new(),
            signal,
            children: Mutex::new(Vec::new()),
        }
    }

    /// 最初の呼び出しだけが理由を確定し、子孫へ伝播する
    fn cancel_with(&self, reason: CancelReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        self.signal.send_replace(true);

        let children = {
            let mut guard = self
                .children
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel_with(reason);
        }
        true
    }

    fn is_done(&self) -> bool {
        if self.reason.get().is_some() {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.cancel_with(CancelReason::DeadlineExceeded);
                true
            }
            _ => false,
        }
    }
}

impl Default for CancellationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationContext {
    /// 明示的に cancel() されるまで有効なコンテキスト
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ContextInner::new(None)),
        }
    }

    /// 現在時刻から `timeout` 後に期限切れとなるコンテキスト
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// 指定時刻に期限切れとなるコンテキスト
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(ContextInner::new(Some(deadline))),
        }
    }

    /// 親と同じデッドラインを持つ子コンテキスト
    pub fn child(&self) -> Self {
        self.derive(self.inner.deadline)
    }

    /// より短いデッドラインを持つ子コンテキスト
    ///
    /// 親のデッドラインの方が早ければそちらが優先される
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(parent) => parent.min(own),
            None => own,
        };
        self.derive(Some(deadline))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let child = Arc::new(ContextInner::new(deadline));
        {
            let mut children = self
                .inner
                .children
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child));
        }
        // 登録前に親がキャンセル済みだった場合
        if let Some(reason) = self.inner.reason.get() {
            child.cancel_with(*reason);
        }
        Self { inner: child }
    }

    /// 明示的にキャンセルする。2回目以降は何もしない。
    ///
    /// この呼び出しで状態が変わった場合に true を返す
    pub fn cancel(&self) -> bool {
        self.inner.cancel_with(CancelReason::Cancelled)
    }

    /// ノンブロッキングでキャンセル済みかを確認
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_done()
    }

    /// キャンセル理由（未キャンセルなら None）
    pub fn reason(&self) -> Option<CancelReason> {
        if self.inner.is_done() {
            self.inner.reason.get().copied()
        } else {
            None
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// キャンセル済みなら `operation` 名付きの Cancelled エラーを返す
    pub fn check(&self, operation: &str) -> EngineResult<()> {
        match self.reason() {
            Some(reason) => Err(EngineError::cancelled(operation, reason)),
            None => Ok(()),
        }
    }

    /// キャンセル（明示またはデッドライン）まで待機
    pub async fn cancelled(&self) {
        if self.inner.is_done() {
            return;
        }
        let mut signal = self.inner.signal.subscribe();
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signal.wait_for(|done| *done) => {}
                    _ = tokio::time::sleep_until(deadline) => {
                        self.inner.cancel_with(CancelReason::DeadlineExceeded);
                    }
                }
            }
            None => {
                let _ = signal.wait_for(|done| *done).await;
            }
        }
    }

    /// Future をコンテキストと競争させる
    ///
    /// 同時に準備完了した場合はキャンセルを優先する
    pub async fn run_until_cancelled<F>(&self, operation: &str, future: F) -> EngineResult<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(EngineError::cancelled(
                operation,
                self.reason().unwrap_or(CancelReason::Cancelled),
            )),
            output = future => Ok(output),
        }
    }
}

/// 単位作業をキャンセルまで繰り返す協調ループ
///
/// キャンセルは単位作業の間でのみ確認し、完了した単位数を返す
pub async fn cooperative_loop<F, Fut>(ctx: &CancellationContext, mut unit: F) -> usize
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut completed = 0;
    while !ctx.is_cancelled() {
        unit(completed).await;
        completed += 1;
    }
    completed
}
