// 並列実行エンジンで共有されるデータ型定義

use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::time::Duration;

/// 投入される作業単位
///
/// 投入後は不変。キューが所有し、ちょうど1つのワーカーが取得する。
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem<I> {
    pub id: u64,
    pub payload: I,
}

impl<I> WorkItem<I> {
    pub fn new(id: u64, payload: I) -> Self {
        Self { id, payload }
    }
}

/// ジョブ単体の処理結果
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<O> {
    Success(O),
    /// ジョブ内の失敗はワーカーを止めずにデータとして返す
    Failed(String),
}

/// ワーカーが生成する結果。生成後は変更されない。
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult<O> {
    pub job_id: u64,
    pub worker_id: usize,
    pub outcome: JobOutcome<O>,
    pub elapsed: Duration,
}

impl<O> JobResult<O> {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Success(_))
    }

    /// 成功値への参照
    pub fn output(&self) -> Option<&O> {
        match &self.outcome {
            JobOutcome::Success(value) => Some(value),
            JobOutcome::Failed(_) => None,
        }
    }

    /// 失敗メッセージへの参照
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            JobOutcome::Success(_) => None,
            JobOutcome::Failed(message) => Some(message),
        }
    }
}

/// 入力列上の連続区間 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// ワーカープールのライフサイクル
///
/// `Created → Running → Draining → Stopped` の一方向のみ遷移する
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PoolState {
    Created,
    Running,
    /// ジョブ投入側がクローズされ、残りのキューを消化中
    Draining,
    /// 全ワーカー終了後、プールが結果ストリームをクローズ済み
    Stopped,
}

/// キャンセルの発生理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CancelReason {
    /// 明示的な cancel() 呼び出し
    Cancelled,
    /// デッドライン到達
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// ストリームの終了状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamEnd {
    /// 全ての値を送信し終えて正常にクローズ
    Completed,
    /// コンテキストのキャンセルにより途中で停止
    Cancelled(CancelReason),
    /// 所有者がクローズせずに消滅（パニック等）
    Aborted,
}

impl StreamEnd {
    /// 複数の上流ストリームの終了状態を合成する
    ///
    /// Aborted > Cancelled > Completed の順で優先される
    pub fn combine(self, other: StreamEnd) -> StreamEnd {
        match (self, other) {
            (Self::Aborted, _) | (_, Self::Aborted) => Self::Aborted,
            (Self::Cancelled(reason), _) | (_, Self::Cancelled(reason)) => Self::Cancelled(reason),
            _ => Self::Completed,
        }
    }
}

/// ワーカーの終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// キューがクローズされ、消化し終えた
    Drained,
    /// コンテキストのキャンセルを検知した
    Cancelled,
    /// 結果の受信側が消えた
    Disconnected,
    /// 回復不能な障害（パニック）
    Panicked,
}

/// プール停止時のレポート
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolReport {
    pub workers_started: usize,
    pub workers_drained: usize,
    pub workers_cancelled: usize,
    pub workers_panicked: usize,
    pub jobs_processed: usize,
}

impl PoolReport {
    /// 全ワーカーが通常終了したかどうか
    pub fn is_clean(&self) -> bool {
        self.workers_panicked == 0 && self.workers_cancelled == 0
    }
}

/// 結果ストリームを消化した後のサマリー
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_time_ms: u64,
    pub average_time_per_job_ms: f64,
    pub termination: StreamEnd,
}
