// 設定管理機能
// ワーカー数・キュー容量・段間バッファの既定値とプリセット

pub mod implementations;

// 公開API
pub use implementations::{ConfigPreset, DefaultEngineConfig};
