// Pipeline - 直列に連結されたストリーム処理段
//
// 各段は独立したタスクとして入力を消費し、入力がクローズされたら自分の出力を
// クローズする。段間は小さな有界バッファなので、遅い下流が上流の送信を止め、
// その背圧がソースまで伝わる。

use super::context::CancellationContext;
use super::fan::{end_after_send_failure, fan_out};
use super::stream::{self, Drained, Recv, StreamReceiver, StreamSender};
use crate::core::{EngineError, EngineResult, StreamEnd};
use std::future::{ready, Future};
use tokio::task::JoinHandle;

/// 所有されたタスク群。join() で全タスクの終了を待つ。
#[derive(Debug, Default)]
pub struct TaskGroup {
    handles: Vec<JoinHandle<()>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.push(tokio::spawn(future));
    }

    pub fn extend(&mut self, other: TaskGroup) {
        self.handles.extend(other.handles);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 全タスクの終了を待つ。パニックしたタスクがあれば最初のものを返す。
    pub async fn join(self) -> EngineResult<()> {
        let mut first_error = None;
        for handle in self.handles {
            if let Err(error) = handle.await {
                first_error.get_or_insert(EngineError::task(error));
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// 1段分の処理ループ
///
/// `step` が None を返した値は下流に送らない（フィルタ）。
/// 上流の終了状態はそのまま下流へ引き継ぐ。
async fn run_stage<T, U, F, Fut>(
    mut input: StreamReceiver<T>,
    output: StreamSender<U>,
    ctx: CancellationContext,
    mut step: F,
) where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Option<U>>,
{
    let end = loop {
        match input.recv_or_cancel(&ctx).await {
            Recv::Value(value) => {
                let Some(next) = step(value).await else {
                    continue;
                };
                if let Err(error) = output.send(next, &ctx).await {
                    break end_after_send_failure(&error, &ctx);
                }
            }
            Recv::Closed(end) => break end,
            Recv::Cancelled(reason) => break StreamEnd::Cancelled(reason),
        }
    };
    output.close(end);
}

/// ストリーム処理段の連結
///
/// 各メソッドは新しい段のタスクを起動し、その出力を末尾とする新しい Pipeline を返す
#[derive(Debug)]
pub struct Pipeline<T> {
    tail: StreamReceiver<T>,
    tasks: TaskGroup,
    buffer: usize,
    ctx: CancellationContext,
}

impl<T> Pipeline<T>
where
    T: Send + 'static,
{
    /// 有限の値列を送出するソース段から始める
    pub fn from_iter<It>(items: It, buffer: usize, ctx: &CancellationContext) -> Self
    where
        It: IntoIterator<Item = T>,
        It::IntoIter: Send + 'static,
    {
        let (tx, rx) = stream::bounded("source", buffer);
        let items = items.into_iter();
        let source_ctx = ctx.clone();

        let mut tasks = TaskGroup::new();
        tasks.spawn(async move {
            let mut end = StreamEnd::Completed;
            for item in items {
                if let Err(error) = tx.send(item, &source_ctx).await {
                    end = end_after_send_failure(&error, &source_ctx);
                    break;
                }
            }
            tx.close(end);
        });

        Self {
            tail: rx,
            tasks,
            buffer,
            ctx: ctx.clone(),
        }
    }

    /// 既存のストリームを先頭段として使う
    pub fn from_stream(stream: StreamReceiver<T>, buffer: usize, ctx: &CancellationContext) -> Self {
        Self {
            tail: stream,
            tasks: TaskGroup::new(),
            buffer,
            ctx: ctx.clone(),
        }
    }

    fn stage<U, F, Fut>(self, name: &str, step: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Option<U>> + Send + 'static,
    {
        let Pipeline {
            tail,
            mut tasks,
            buffer,
            ctx,
        } = self;

        let (tx, rx) = stream::bounded(format!("{name}[{}]", tasks.len()), buffer);
        tasks.spawn(run_stage(tail, tx, ctx.clone(), step));

        Pipeline {
            tail: rx,
            tasks,
            buffer,
            ctx,
        }
    }

    /// 各値を変換する段
    pub fn map<U, F>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + 'static,
    {
        self.stage("map", move |value| ready(Some(f(value))))
    }

    /// 条件を満たす値のみを通す段
    ///
    /// 入力を最後まで消化してから出力をクローズする
    pub fn filter<F>(self, predicate: F) -> Pipeline<T>
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        self.stage("filter", move |value| {
            ready(if predicate(&value) { Some(value) } else { None })
        })
    }

    /// 非同期処理を1値ずつ順に行う段
    pub fn then<U, F, Fut>(self, f: F) -> Pipeline<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        self.stage("then", move |value| {
            let pending = f(value);
            async move { Some(pending.await) }
        })
    }

    /// 競合する `workers` 個のワーカーで処理し、出力を合流する段
    ///
    /// この段以降は順序が保証されない
    pub fn fan_out<U, F, Fut>(self, workers: usize, f: F) -> EngineResult<Pipeline<U>>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = U> + Send + 'static,
    {
        let Pipeline {
            tail,
            mut tasks,
            buffer,
            ctx,
        } = self;

        let (merged, fan_tasks) = fan_out(tail, workers, f, buffer, &ctx)?;
        tasks.extend(fan_tasks);

        Ok(Pipeline {
            tail: merged,
            tasks,
            buffer,
            ctx,
        })
    }

    pub fn context(&self) -> &CancellationContext {
        &self.ctx
    }

    /// 末尾のストリームとタスク群を取り出す（手動で消化する場合）
    pub fn into_parts(self) -> (StreamReceiver<T>, TaskGroup) {
        (self.tail, self.tasks)
    }

    /// 末尾を最後まで消化し、全段の終了を待つ
    pub async fn drain(self) -> EngineResult<Drained<T>> {
        let drained = self.tail.drain().await;
        self.tasks.join().await?;
        Ok(drained)
    }

    /// 全ての値を受け取る。途中停止はエラーとして返す。
    pub async fn collect(self) -> EngineResult<Vec<T>> {
        let name = self.tail.name().to_string();
        self.drain().await?.into_result(&name)
    }
}
