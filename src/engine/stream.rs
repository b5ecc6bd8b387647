// Stream - クローズ可能な有界チャネル
//
// 所有者（StreamSender）だけがストリームをクローズでき、終了状態を記録する。
// 終了状態はチャネルが閉じる前に記録されるため、受信側が「クローズ済み」を
// 観測した時点で必ず読める。

use super::context::CancellationContext;
use crate::core::{CancelReason, EngineError, EngineResult, StreamEnd};
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, Mutex};

type EndSlot = Arc<OnceLock<StreamEnd>>;

/// 有界ストリームを作成する
///
/// 容量0は容量1として扱う（アンバッファードチャネル相当）
pub fn bounded<T>(name: impl Into<String>, capacity: usize) -> (StreamSender<T>, StreamReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let end: EndSlot = Arc::new(OnceLock::new());
    let name = name.into();
    (
        StreamSender {
            tx,
            end: Arc::clone(&end),
            name: name.clone(),
        },
        StreamReceiver { rx, end, name },
    )
}

async fn send_with_context<T>(
    tx: &mpsc::Sender<T>,
    name: &str,
    value: T,
    ctx: &CancellationContext,
) -> EngineResult<()> {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(EngineError::cancelled(
            name,
            ctx.reason().unwrap_or(CancelReason::Cancelled),
        )),
        sent = tx.send(value) => sent.map_err(|_| {
            EngineError::channel(format!("{name}: 受信側が閉じられました"))
        }),
    }
}

/// ストリームの所有者側。クローンできず、クローズできるのはこれだけ。
#[derive(Debug)]
pub struct StreamSender<T> {
    tx: mpsc::Sender<T>,
    end: EndSlot,
    name: String,
}

impl<T> StreamSender<T> {
    /// 送信専用のハンドルを払い出す（クローズ権限なし）
    pub fn producer(&self) -> StreamProducer<T> {
        StreamProducer {
            tx: self.tx.clone(),
            name: self.name.clone(),
        }
    }

    /// 値を送信する。満杯なら空きが出るかキャンセルされるまで待機。
    pub async fn send(&self, value: T, ctx: &CancellationContext) -> EngineResult<()> {
        send_with_context(&self.tx, &self.name, value, ctx).await
    }

    /// 終了状態を記録してストリームをクローズする
    ///
    /// 払い出した StreamProducer が全て破棄された時点で受信側に閉鎖が届く
    pub fn close(self, end: StreamEnd) {
        let _ = self.end.set(end);
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Drop for StreamSender<T> {
    fn drop(&mut self) {
        // close() を経ずに破棄された場合（パニック等）
        let _ = self.end.set(StreamEnd::Aborted);
    }
}

/// 送信専用ハンドル
#[derive(Debug)]
pub struct StreamProducer<T> {
    tx: mpsc::Sender<T>,
    name: String,
}

impl<T> Clone for StreamProducer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T> StreamProducer<T> {
    pub async fn send(&self, value: T, ctx: &CancellationContext) -> EngineResult<()> {
        send_with_context(&self.tx, &self.name, value, ctx).await
    }

    /// 受信側が既に破棄されているか
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 受信の結果
#[derive(Debug, PartialEq)]
pub enum Recv<T> {
    Value(T),
    /// 上流がクローズされ、バッファも空
    Closed(StreamEnd),
    /// 受信待ちの間にコンテキストがキャンセルされた
    Cancelled(CancelReason),
}

/// ストリームの受信側
#[derive(Debug)]
pub struct StreamReceiver<T> {
    rx: mpsc::Receiver<T>,
    end: EndSlot,
    name: String,
}

impl<T> StreamReceiver<T> {
    /// 次の値を受信する。クローズ済みかつ空なら None。
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// キャンセルを監視しながら受信する
    pub async fn recv_or_cancel(&mut self, ctx: &CancellationContext) -> Recv<T> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Recv::Cancelled(ctx.reason().unwrap_or(CancelReason::Cancelled)),
            received = self.rx.recv() => match received {
                Some(value) => Recv::Value(value),
                None => Recv::Closed(self.end_or_aborted()),
            },
        }
    }

    /// 所有者が記録した終了状態（未クローズなら None）
    pub fn end(&self) -> Option<StreamEnd> {
        self.end.get().copied()
    }

    fn end_or_aborted(&self) -> StreamEnd {
        self.end().unwrap_or(StreamEnd::Aborted)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// クローズまで全ての値を受信する
    pub async fn drain(mut self) -> Drained<T> {
        let mut values = Vec::new();
        while let Some(value) = self.rx.recv().await {
            values.push(value);
        }
        Drained {
            values,
            end: self.end_or_aborted(),
        }
    }

    /// 全ての値を受信し、正常終了以外はエラーとして返す
    pub async fn collect(self) -> EngineResult<Vec<T>> {
        let name = self.name.clone();
        self.drain().await.into_result(&name)
    }

    /// 複数ワーカーで取り合う共有受信側に変換する
    pub fn shared(self) -> SharedReceiver<T> {
        SharedReceiver {
            inner: Arc::new(Mutex::new(self)),
        }
    }
}

/// drain() の結果
#[derive(Debug)]
pub struct Drained<T> {
    pub values: Vec<T>,
    pub end: StreamEnd,
}

impl<T> Drained<T> {
    pub fn is_complete(&self) -> bool {
        self.end == StreamEnd::Completed
    }

    pub fn into_result(self, name: &str) -> EngineResult<Vec<T>> {
        match self.end {
            StreamEnd::Completed => Ok(self.values),
            StreamEnd::Cancelled(reason) => Err(EngineError::cancelled(name, reason)),
            StreamEnd::Aborted => Err(EngineError::stream_aborted(name)),
        }
    }
}

/// 複数の消費者が先着順で値を取得する受信側
///
/// 各値はちょうど1つの消費者にのみ渡される
#[derive(Debug)]
pub struct SharedReceiver<T> {
    inner: Arc<Mutex<StreamReceiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReceiver<T> {
    /// 次の値を先着で取得する
    pub async fn claim(&self, ctx: &CancellationContext) -> Recv<T> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Recv::Cancelled(ctx.reason().unwrap_or(CancelReason::Cancelled)),
            received = async {
                let mut rx = self.inner.lock().await;
                match rx.rx.recv().await {
                    Some(value) => Recv::Value(value),
                    None => Recv::Closed(rx.end_or_aborted()),
                }
            } => received,
        }
    }
}
