// パイプライン段とFan-Out/Fan-Inの統合テスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use fixtures::{numbered_jobs, quiet_config};
use parallel_engine::core::{handler_fn, StreamEnd};
use parallel_engine::engine::{bounded, fan_in, CancellationContext, Pipeline, WorkerPool};
use parallel_engine::services::NoOpProgressReporter;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_square_then_filter_keeps_order() {
    let ctx = CancellationContext::new();

    let output = Pipeline::from_iter(1..=10u64, 1, &ctx)
        .map(|n| n * n)
        .filter(|n| *n > 10)
        .collect()
        .await
        .unwrap();

    assert_eq!(output, vec![16, 25, 36, 49, 64, 81, 100]);
}

#[tokio::test]
async fn test_long_chain_with_larger_buffers() {
    let ctx = CancellationContext::new();

    let output = Pipeline::from_iter(0..1_000u64, 8, &ctx)
        .map(|n| n + 1)
        .filter(|n| n % 2 == 0)
        .then(|n| async move {
            tokio::task::yield_now().await;
            n / 2
        })
        .map(|n| n as usize)
        .collect()
        .await
        .unwrap();

    assert_eq!(output, (1..=500).collect::<Vec<usize>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fan_out_stage_produces_square_set() {
    let ctx = CancellationContext::new();

    let output = Pipeline::from_iter(1..=10u64, 1, &ctx)
        .fan_out(3, |n| async move {
            tokio::time::sleep(Duration::from_millis(11 - n)).await;
            n * n
        })
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(output.len(), 10);
    let squares: HashSet<u64> = output.into_iter().collect();
    assert_eq!(squares, (1..=10).map(|n| n * n).collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_fan_out_followed_by_filter() {
    let ctx = CancellationContext::new();

    let total: u64 = Pipeline::from_iter(1..=100u64, 2, &ctx)
        .fan_out(4, |n| async move { n * 3 })
        .unwrap()
        .filter(|n| n % 2 == 0)
        .collect()
        .await
        .unwrap()
        .into_iter()
        .sum();

    // 2..=100 の偶数の3倍の和
    assert_eq!(total, 3 * (2..=100).step_by(2).sum::<u64>());
}

#[tokio::test]
async fn test_fan_in_merges_independent_producers() {
    let ctx = CancellationContext::new();
    let mut inputs = Vec::new();

    for producer in 0..4u64 {
        let (tx, rx) = bounded(format!("producer[{producer}]"), 1);
        let ctx = ctx.clone();
        tokio::spawn(async move {
            for i in 0..25 {
                if producer == 0 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                tx.send(producer * 100 + i, &ctx).await.unwrap();
            }
            tx.close(StreamEnd::Completed);
        });
        inputs.push(rx);
    }

    let (merged, tasks) = fan_in(inputs, 1, &ctx);
    let values = merged.collect().await.unwrap();
    tasks.join().await.unwrap();

    assert_eq!(values.len(), 100);
    let unique: HashSet<u64> = values.iter().copied().collect();
    assert_eq!(unique.len(), 100);

    // 各入力内の順序は保たれる
    let from_zero: Vec<u64> = values.iter().copied().filter(|v| *v < 100).collect();
    assert_eq!(from_zero, (0..25).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_pool_results_feed_a_pipeline() {
    let ctx = CancellationContext::new();
    let mut pool = WorkerPool::start(
        &quiet_config(3, 4),
        handler_fn(|_, n: u64| async move { Ok(n * n) }),
        ctx.clone(),
        Arc::new(NoOpProgressReporter::new()),
    )
    .unwrap();
    let results = pool.results().unwrap();
    let producer = pool.submit_all(numbered_jobs(20));

    let mut outputs = Pipeline::from_stream(results, 1, &ctx)
        .filter(|result| result.is_success())
        .map(|result| result.output().copied().unwrap_or_default())
        .filter(|square| *square >= 100)
        .collect()
        .await
        .unwrap();
    outputs.sort_unstable();

    assert_eq!(producer.await.unwrap().unwrap(), 20);
    assert_eq!(outputs, (10..20u64).map(|n| n * n).collect::<Vec<_>>());
    assert!(pool.join().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_dropped_consumer_unwinds_every_stage() {
    let ctx = CancellationContext::new();
    let (mut tail, tasks) = Pipeline::from_iter(0u64.., 1, &ctx)
        .map(|n| n * 2)
        .fan_out(2, |n| async move { n + 1 })
        .unwrap()
        .into_parts();

    assert!(tail.recv().await.is_some());
    drop(tail);

    // 無限ソースでも下流が消えれば全段が終了する
    tokio::time::timeout(Duration::from_secs(5), tasks.join())
        .await
        .expect("stages should exit")
        .unwrap();
}
