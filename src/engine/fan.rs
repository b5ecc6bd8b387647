// Fan-Out/Fan-In Router - 1本のストリームを複数ワーカーへ分配し、1本に合流
//
// 分配は先着順（各値はちょうど1つのワーカーが取得）。
// 合流は入力ごとに独立した転送タスクを持つため、速い上流が遅い上流に引きずられない。

use super::context::CancellationContext;
use super::pipeline::TaskGroup;
use super::stream::{self, Recv, StreamProducer, StreamReceiver};
use crate::core::{CancelReason, EngineError, EngineResult, StreamEnd};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// 入力を `workers` 個の競合ワーカーで処理し、出力を1本に合流する
///
/// 出力順序は保証しない
pub fn fan_out<T, U, F, Fut>(
    input: StreamReceiver<T>,
    workers: usize,
    f: F,
    buffer: usize,
    ctx: &CancellationContext,
) -> EngineResult<(StreamReceiver<U>, TaskGroup)>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = U> + Send + 'static,
{
    if workers == 0 {
        return Err(EngineError::configuration(
            "fan-out のワーカー数は1以上である必要があります",
        ));
    }

    let shared = input.shared();
    let f = Arc::new(f);
    let mut tasks = TaskGroup::new();
    let mut outputs = Vec::with_capacity(workers);

    for worker_id in 0..workers {
        let (tx, rx) = stream::bounded(format!("fan_out[{worker_id}]"), buffer);
        let shared = shared.clone();
        let f = Arc::clone(&f);
        let ctx = ctx.clone();

        tasks.spawn(async move {
            let end = loop {
                match shared.claim(&ctx).await {
                    Recv::Value(value) => {
                        let output = f(value).await;
                        if let Err(error) = tx.send(output, &ctx).await {
                            break end_after_send_failure(&error, &ctx);
                        }
                    }
                    Recv::Closed(end) => break end,
                    Recv::Cancelled(reason) => break StreamEnd::Cancelled(reason),
                }
            };
            tx.close(end);
        });
        outputs.push(rx);
    }
    drop(shared);

    let (merged, merge_tasks) = fan_in(outputs, buffer, ctx);
    tasks.extend(merge_tasks);
    Ok((merged, tasks))
}

/// 複数のストリームを1本に合流する
///
/// 全入力がクローズされた後にのみ合流ストリームをクローズする。
/// 終了状態は全入力の終了状態を合成したもの。
pub fn fan_in<T>(
    inputs: Vec<StreamReceiver<T>>,
    buffer: usize,
    ctx: &CancellationContext,
) -> (StreamReceiver<T>, TaskGroup)
where
    T: Send + 'static,
{
    let (merged_tx, merged_rx) = stream::bounded("fan_in", buffer);

    let forwarders: Vec<JoinHandle<StreamEnd>> = inputs
        .into_iter()
        .map(|input| tokio::spawn(forward(input, merged_tx.producer(), ctx.clone())))
        .collect();

    let mut tasks = TaskGroup::new();
    tasks.spawn(async move {
        let mut end = StreamEnd::Completed;
        for forwarder in forwarders {
            // 転送タスクのパニックは Aborted として扱う
            end = end.combine(forwarder.await.unwrap_or(StreamEnd::Aborted));
        }
        merged_tx.close(end);
    });

    (merged_rx, tasks)
}

/// 1本の入力を合流先へ転送し、入力の終了状態を返す
async fn forward<T>(
    mut input: StreamReceiver<T>,
    merged: StreamProducer<T>,
    ctx: CancellationContext,
) -> StreamEnd {
    loop {
        match input.recv_or_cancel(&ctx).await {
            Recv::Value(value) => {
                if let Err(error) = merged.send(value, &ctx).await {
                    return end_after_send_failure(&error, &ctx);
                }
            }
            Recv::Closed(end) => return end,
            Recv::Cancelled(reason) => return StreamEnd::Cancelled(reason),
        }
    }
}

/// 送信失敗時の終了状態: キャンセルならその理由、受信側消滅なら Aborted
pub(crate) fn end_after_send_failure(error: &EngineError, ctx: &CancellationContext) -> StreamEnd {
    match error {
        EngineError::Cancelled { reason, .. } => StreamEnd::Cancelled(*reason),
        _ if ctx.is_cancelled() => {
            StreamEnd::Cancelled(ctx.reason().unwrap_or(CancelReason::Cancelled))
        }
        _ => StreamEnd::Aborted,
    }
}
