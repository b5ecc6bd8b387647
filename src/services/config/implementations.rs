// 設定管理の具象実装

use crate::core::{EngineConfig, EngineError, EngineResult, ValidationError, ValidationResult};

/// デフォルト設定実装
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultEngineConfig {
    workers: usize,
    queue_capacity: usize,
    stage_buffer_size: usize,
    enable_progress: bool,
}

impl DefaultEngineConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: workers.max(1) * 4,
            stage_buffer_size: 1,
            enable_progress: true,
        }
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_stage_buffer_size(mut self, stage_buffer_size: usize) -> Self {
        self.stage_buffer_size = stage_buffer_size;
        self
    }

    pub fn with_progress_reporting(mut self, enable: bool) -> Self {
        self.enable_progress = enable;
        self
    }

    /// 0 を含む設定を拒否する
    pub fn validate(&self) -> ValidationResult<()> {
        if self.workers == 0 {
            return Err(ValidationError::new("workers", "1以上である必要があります"));
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::new(
                "queue_capacity",
                "1以上である必要があります",
            ));
        }
        if self.stage_buffer_size == 0 {
            return Err(ValidationError::new(
                "stage_buffer_size",
                "1以上である必要があります",
            ));
        }
        Ok(())
    }
}

impl Default for DefaultEngineConfig {
    fn default() -> Self {
        Self::new(num_cpus::get().max(1))
    }
}

impl EngineConfig for DefaultEngineConfig {
    fn worker_count(&self) -> usize {
        self.workers
    }

    fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    fn stage_buffer_size(&self) -> usize {
        self.stage_buffer_size
    }

    fn enable_progress_reporting(&self) -> bool {
        self.enable_progress
    }
}

/// 名前付きの設定プリセット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// CPU数のワーカー、小さなバッファ
    Default,
    /// CPU数の2倍のワーカー、大きなキュー
    HighThroughput,
    /// 2ワーカー、進捗表示なし（テスト用）
    Testing,
}

impl ConfigPreset {
    pub const ALL: [ConfigPreset; 3] = [Self::Default, Self::HighThroughput, Self::Testing];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::HighThroughput => "high_throughput",
            Self::Testing => "testing",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Default => "バランスの取れたデフォルト設定",
            Self::HighThroughput => "スループット重視（ワーカー数・キュー容量を拡大）",
            Self::Testing => "テスト用の小さく静かな設定",
        }
    }

    /// 名前からプリセットを解決する
    pub fn from_name(name: &str) -> EngineResult<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == name)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|p| p.name()).collect();
                EngineError::configuration(format!(
                    "不明なプリセット '{name}' (利用可能: {})",
                    known.join(", ")
                ))
            })
    }

    pub fn config(&self) -> DefaultEngineConfig {
        let cpus = num_cpus::get().max(1);
        match self {
            Self::Default => DefaultEngineConfig::new(cpus),
            Self::HighThroughput => DefaultEngineConfig::new(cpus * 2)
                .with_queue_capacity(cpus * 64)
                .with_stage_buffer_size(16),
            Self::Testing => DefaultEngineConfig::new(2)
                .with_queue_capacity(4)
                .with_progress_reporting(false),
        }
    }
}
