// エンジン層 - 並列実行のプリミティブとオーケストレーション
// コア層の型とトレイトの上に、ストリーム・キャンセル・プール・パイプラインを構築

pub mod collector;
pub mod context;
pub mod fan;
pub mod partition;
pub mod pipeline;
pub mod pool;
pub mod producer;
pub mod stream;

// 公開API
pub use collector::{collect_results, spawn_result_collector, Collected};
pub use context::{cooperative_loop, CancellationContext};
pub use fan::{fan_in, fan_out};
pub use partition::{
    parallel_map_partitions, parallel_reduce, parallel_reduce_with_context, parallel_sum,
    partition, sequential_sum, verify_partitions, CANCEL_CHECK_INTERVAL,
};
pub use pipeline::{Pipeline, TaskGroup};
pub use pool::{JobSubmitter, WorkerPool};
pub use producer::spawn_producer;
pub use stream::{
    bounded, Drained, Recv, SharedReceiver, StreamProducer, StreamReceiver, StreamSender,
};
