// Custom error types for the concurrent execution engine
// 並列実行エンジン専用のカスタムエラー型定義

use thiserror::Error;

/// 並列実行エンジン固有のエラー型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("プール終了済みエラー: ジョブ {job_id} はクローズ後に投入されました")]
    PoolClosed { job_id: u64 },

    #[error("ワーカー障害: worker {worker_id} - {message}")]
    WorkerFault { worker_id: usize, message: String },

    #[error("キャンセルエラー: {operation} は中断されました ({reason})")]
    Cancelled {
        operation: String,
        reason: crate::core::types::CancelReason,
    },

    #[error("パーティション不整合: 長さ合計 {covered} != 入力長 {expected} ({details})")]
    PartitionMismatch {
        covered: usize,
        expected: usize,
        details: String,
    },

    #[error("ストリーム異常終了: {stream} の所有者がクローズせずに終了しました")]
    StreamAborted { stream: String },

    #[error("チャンネルエラー: {message}")]
    ChannelClosed { message: String },

    #[error("設定エラー: {message}")]
    ConfigurationError { message: String },

    #[error("バリデーションエラー: {field} - {reason}")]
    ValidationError { field: String, reason: String },

    #[error("タスクエラー: {source}")]
    TaskError {
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("内部エラー: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    /// クローズ後投入エラーの作成
    pub fn pool_closed(job_id: u64) -> Self {
        Self::PoolClosed { job_id }
    }

    /// ワーカー障害エラーの作成
    pub fn worker_fault(worker_id: usize, message: impl Into<String>) -> Self {
        Self::WorkerFault {
            worker_id,
            message: message.into(),
        }
    }

    /// キャンセルエラーの作成
    pub fn cancelled(
        operation: impl Into<String>,
        reason: crate::core::types::CancelReason,
    ) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            reason,
        }
    }

    /// パーティション不整合エラーの作成
    pub fn partition_mismatch(covered: usize, expected: usize, details: impl Into<String>) -> Self {
        Self::PartitionMismatch {
            covered,
            expected,
            details: details.into(),
        }
    }

    /// ストリーム異常終了エラーの作成
    pub fn stream_aborted(stream: impl Into<String>) -> Self {
        Self::StreamAborted {
            stream: stream.into(),
        }
    }

    /// チャンネルエラーの作成
    pub fn channel(message: impl Into<String>) -> Self {
        Self::ChannelClosed {
            message: message.into(),
        }
    }

    /// 設定エラーの作成
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// バリデーションエラーの作成
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// タスクエラーの作成
    pub fn task(source: tokio::task::JoinError) -> Self {
        Self::TaskError { source }
    }

    /// キャンセルによる中断かどうか
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PartitionMismatch { .. } | Self::InternalError { .. } => ErrorSeverity::Critical,
            Self::ValidationError { .. } | Self::ConfigurationError { .. } => ErrorSeverity::High,
            Self::StreamAborted { .. } | Self::TaskError { .. } => ErrorSeverity::High,
            Self::WorkerFault { .. } | Self::ChannelClosed { .. } => ErrorSeverity::Medium,
            Self::PoolClosed { .. } => ErrorSeverity::Medium,
            Self::Cancelled { .. } => ErrorSeverity::Low,
        }
    }

    /// エラーが回復可能かどうかを判定
    ///
    /// 構造的な不変条件の違反（パーティション不整合）は回復不能
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::PartitionMismatch { .. } | Self::InternalError { .. } => false,
            Self::ValidationError { .. } | Self::ConfigurationError { .. } => false,
            Self::StreamAborted { .. } => false,
            Self::PoolClosed { .. } => true,
            Self::WorkerFault { .. } => true,
            Self::Cancelled { .. } => true,
            Self::ChannelClosed { .. } => true,
            Self::TaskError { .. } => true,
        }
    }
}

/// エラーの重要度レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 低重要度 - ログ出力程度
    Low,
    /// 中重要度 - 警告レベル
    Medium,
    /// 高重要度 - 要対応
    High,
    /// 致命的 - システム停止レベル
    Critical,
}

/// 並列実行の結果型
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// 検証結果 - バリデーション専用の結果型
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// バリデーション専用エラー型
#[derive(Error, Debug, Clone, PartialEq)]
#[error("バリデーションエラー: {field} - {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    /// 新しいバリデーションエラーを作成
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(error: ValidationError) -> Self {
        EngineError::ValidationError {
            field: error.field,
            reason: error.reason,
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(error: anyhow::Error) -> Self {
        EngineError::InternalError { source: error }
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(error: tokio::task::JoinError) -> Self {
        EngineError::TaskError { source: error }
    }
}
