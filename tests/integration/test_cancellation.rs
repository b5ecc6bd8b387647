// キャンセルとデッドラインの統合テスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use fixtures::{quiet_config, RecordingReporter};
use parallel_engine::core::{handler_fn, CancelReason, EngineError, StreamEnd, WorkItem, WorkerExit};
use parallel_engine::engine::{
    collect_results, cooperative_loop, parallel_reduce_with_context, CancellationContext, Pipeline,
    WorkerPool,
};
use std::sync::Arc;
use tokio::time::{Duration, Instant};

#[tokio::test(start_paused = true)]
async fn test_loop_stops_after_unit_in_flight_at_deadline() {
    let ctx = CancellationContext::with_timeout(Duration::from_millis(250));
    let started = Instant::now();

    let completed = cooperative_loop(&ctx, |_| tokio::time::sleep(Duration::from_millis(100))).await;

    // 3単位目は期限前に始まるので最後まで実行される
    assert_eq!(completed, 3);
    assert_eq!(ctx.reason(), Some(CancelReason::DeadlineExceeded));
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_units_straddling_deadline_run_to_completion() {
    let ctx = CancellationContext::with_timeout(Duration::from_millis(200));

    let completed = cooperative_loop(&ctx, |_| tokio::time::sleep(Duration::from_millis(100))).await;

    // 2単位目の終了時刻がちょうど期限
    assert_eq!(completed, 2);
}

#[tokio::test]
async fn test_cancel_is_idempotent_and_reason_is_stable() {
    let ctx = CancellationContext::with_timeout(Duration::from_secs(60));

    assert!(ctx.cancel());
    assert!(!ctx.cancel());
    assert_eq!(ctx.reason(), Some(CancelReason::Cancelled));

    let error = ctx.check("upload").unwrap_err();
    assert!(matches!(
        error,
        EngineError::Cancelled {
            reason: CancelReason::Cancelled,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_parent_cancel_reaches_every_descendant() {
    let root = CancellationContext::new();
    let child = root.child();
    let grandchild = child.child_with_timeout(Duration::from_secs(10));

    let waiter = {
        let grandchild = grandchild.clone();
        tokio::spawn(async move { grandchild.cancelled().await })
    };

    root.cancel();
    waiter.await.unwrap();

    assert_eq!(child.reason(), Some(CancelReason::Cancelled));
    assert_eq!(grandchild.reason(), Some(CancelReason::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_child_deadline_does_not_cancel_parent() {
    let root = CancellationContext::new();
    let child = root.child_with_timeout(Duration::from_millis(50));

    child.cancelled().await;

    assert_eq!(child.reason(), Some(CancelReason::DeadlineExceeded));
    assert!(!root.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_pool_deadline_ends_results_as_cancelled() {
    let ctx = CancellationContext::with_timeout(Duration::from_millis(250));
    let reporter = Arc::new(RecordingReporter::new());
    let mut pool = WorkerPool::start(
        &quiet_config(3, 64),
        handler_fn(|_, n: u64| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(n)
        }),
        ctx.clone(),
        Arc::clone(&reporter),
    )
    .unwrap();
    let results = pool.results().unwrap();

    for id in 0..60 {
        pool.submit(WorkItem::new(id, id)).await.unwrap();
    }

    let collected = collect_results(results, 60, reporter.as_ref()).await;
    assert_eq!(
        collected.summary.termination,
        StreamEnd::Cancelled(CancelReason::DeadlineExceeded)
    );
    // 期限後に終わった3件目の結果は送信されない
    assert_eq!(collected.summary.total_jobs, 6);

    let exits = reporter.exits();
    assert_eq!(exits.len(), 3);
    assert!(exits.iter().all(|(_, exit)| *exit == WorkerExit::Cancelled));

    let report = pool.join().await.unwrap();
    assert_eq!(report.workers_cancelled, 3);
    assert_eq!(report.jobs_processed, 6);
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_deadline_stops_infinite_source() {
    let ctx = CancellationContext::with_timeout(Duration::from_millis(500));

    let drained = Pipeline::from_iter(0u64.., 1, &ctx)
        .then(|n| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            n
        })
        .filter(|n| n % 2 == 0)
        .drain()
        .await
        .unwrap();

    assert_eq!(
        drained.end,
        StreamEnd::Cancelled(CancelReason::DeadlineExceeded)
    );
    assert!(!drained.values.is_empty());
    assert!(drained.values.len() <= 5);
}

#[tokio::test]
async fn test_explicit_cancel_from_another_task() {
    let ctx = CancellationContext::new();
    let pipeline = Pipeline::from_iter(0u64.., 1, &ctx).map(|n| n + 1);

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let error = pipeline.collect().await.unwrap_err();
    assert!(error.is_cancelled());
}

#[test]
fn test_cancelled_reduction_returns_error() {
    let ctx = CancellationContext::new();
    ctx.cancel();

    let data: Vec<u64> = (0..10_000).collect();
    let result = parallel_reduce_with_context(&ctx, &data, 4, 0u64, |acc, v| acc + v, |a, b| a + b);

    assert!(matches!(result, Err(EngineError::Cancelled { .. })));
}
