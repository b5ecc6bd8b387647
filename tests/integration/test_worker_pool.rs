// ワーカープールの統合テスト
#[path = "../fixtures/mod.rs"]
mod fixtures;

use fixtures::{numbered_jobs, quiet_config, RecordingReporter};
use parallel_engine::core::{handler_fn, EngineError, PoolState, StreamEnd, WorkItem, WorkerExit};
use parallel_engine::engine::{collect_results, CancellationContext, WorkerPool};
use parallel_engine::services::NoOpProgressReporter;
use parallel_engine::workloads::square_handler;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn square_pool(workers: usize, capacity: usize) -> WorkerPool<u64, u64> {
    WorkerPool::start(
        &quiet_config(workers, capacity),
        handler_fn(|_, n: u64| async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(n * n)
        }),
        CancellationContext::new(),
        Arc::new(NoOpProgressReporter::new()),
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_job_yields_exactly_one_result() {
    const JOBS: u64 = 12;

    for workers in [1, 2, 5, 12] {
        let mut pool = square_pool(workers, 3);
        let results = pool.results().unwrap();
        let producer = pool.submit_all(numbered_jobs(JOBS));

        let values = results.collect().await.unwrap();
        assert_eq!(producer.await.unwrap().unwrap(), JOBS as usize);

        assert_eq!(values.len(), JOBS as usize, "workers = {workers}");
        let ids: HashSet<u64> = values.iter().map(|r| r.job_id).collect();
        assert_eq!(ids, (0..JOBS).collect::<HashSet<_>>());
        assert!(values.iter().all(|r| r.output() == Some(&(r.job_id * r.job_id))));

        let report = pool.join().await.unwrap();
        assert_eq!(report.workers_started, workers);
        assert_eq!(report.jobs_processed, JOBS as usize);
        assert!(report.is_clean());
    }
}

#[tokio::test]
async fn test_reporter_sees_worker_lifecycle_and_summary() {
    let reporter = Arc::new(RecordingReporter::new());
    let mut pool = WorkerPool::start(
        &quiet_config(3, 4),
        square_handler(0),
        CancellationContext::new(),
        Arc::clone(&reporter),
    )
    .unwrap();
    let results = pool.results().unwrap();

    let mut items: Vec<WorkItem<i64>> = (1..=9).map(|id| WorkItem::new(id, id as i64)).collect();
    items.push(WorkItem::new(100, i64::MAX));
    let producer = pool.submit_all(items);

    let collected = collect_results(results, 10, reporter.as_ref()).await;
    producer.await.unwrap().unwrap();
    pool.join().await.unwrap();

    assert_eq!(collected.summary.total_jobs, 10);
    assert_eq!(collected.summary.failed, 1);
    assert_eq!(collected.summary.termination, StreamEnd::Completed);

    let errors = reporter.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, 100);

    let mut starts = reporter.worker_starts();
    starts.sort_unstable();
    assert_eq!(starts, vec![0, 1, 2]);

    let exits = reporter.exits();
    assert_eq!(exits.len(), 3);
    assert!(exits.iter().all(|(_, exit)| *exit == WorkerExit::Drained));

    assert_eq!(reporter.progress().last(), Some(&(10, 10)));
    assert_eq!(reporter.completed().unwrap().succeeded, 9);
}

#[tokio::test]
async fn test_close_is_idempotent_and_rejects_late_jobs() {
    let mut pool = square_pool(2, 2);
    let results = pool.results().unwrap();
    let submitter = pool.submitter();

    submitter.submit(WorkItem::new(1, 3)).await.unwrap();
    assert!(submitter.close());
    assert!(!submitter.close());
    assert!(!pool.close());
    assert!(submitter.is_closed());

    let error = submitter.submit(WorkItem::new(2, 4)).await.unwrap_err();
    assert!(matches!(error, EngineError::PoolClosed { job_id: 2 }));

    let values = results.collect().await.unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].output(), Some(&9));
    pool.join().await.unwrap();
}

#[tokio::test]
async fn test_degraded_pool_keeps_draining() {
    let mut pool: WorkerPool<u64, u64> = WorkerPool::start(
        &quiet_config(4, 16),
        handler_fn(|id, n: u64| async move {
            if id % 5 == 0 {
                panic!("fault on job {id}");
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok(n)
        }),
        CancellationContext::new(),
        Arc::new(NoOpProgressReporter::new()),
    )
    .unwrap();
    let results = pool.results().unwrap();

    // ジョブ5と10で2ワーカーが失われる
    for id in 1..=10 {
        pool.submit(WorkItem::new(id, id)).await.unwrap();
    }
    pool.close();

    let drained = results.drain().await;
    assert_eq!(drained.end, StreamEnd::Aborted);
    assert_eq!(drained.values.len(), 8);
    assert_eq!(pool.alive_workers(), 0);
    assert!(pool.state() >= PoolState::Draining);

    let report = pool.join().await.unwrap();
    assert_eq!(report.workers_panicked, 2);
    assert_eq!(report.workers_drained, 2);
}

#[tokio::test]
async fn test_join_without_draining_does_not_hang() {
    let pool = square_pool(2, 8);
    for id in 0..5 {
        pool.submit(WorkItem::new(id, id)).await.unwrap();
    }

    let report = tokio::time::timeout(Duration::from_secs(5), pool.join())
        .await
        .expect("join should finish")
        .unwrap();
    assert_eq!(report.workers_started, 2);
}
