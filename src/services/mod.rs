// サービス層 - エンジンの外側の協調者
// 設定と進捗報告の具象実装を提供

pub mod config;
pub mod monitoring;

// 公開API
pub use config::{ConfigPreset, DefaultEngineConfig};
pub use monitoring::{ConsoleProgressReporter, NoOpProgressReporter};
