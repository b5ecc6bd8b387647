// 進捗監視機能
// 処理開始・進捗・ジョブ失敗・ワーカー終了・完了の報告

pub mod implementations;

// 公開API
pub use implementations::{ConsoleProgressReporter, NoOpProgressReporter};
