use std::sync::Arc;
use std::time::Duration;

use mixbench_engine::{Benchmark, BenchmarkBuilder, EngineError, Phase, WorkloadProfile};
use mixbench_test::backend::FakeBackend;

fn benchmark(workload: &str) -> BenchmarkBuilder {
    mixbench_test::tracing::init();
    Benchmark::builder(WorkloadProfile::resolve(workload).unwrap()).seed(0xbe9c)
}

#[tokio::test]
async fn write_heavy_scenario() {
    let backend = FakeBackend::new();
    let report = benchmark("write-heavy")
        .ops(10)
        .payload_size(5)
        .prepopulate(3)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap();

    let calls = backend.calls();
    assert_eq!(calls.bulk_insert, 1);
    assert_eq!(calls.bulk_inserted, 3);
    assert_eq!(calls.put, report.writes);
    assert_eq!(calls.point_get, report.reads);

    assert_eq!(report.writes + report.reads, 10);
    assert_eq!(report.total_ops, 10);

    let line = report.to_string();
    assert!(line.contains("'write-heavy'"), "{line}");
    assert!(line.contains("data size 5"), "{line}");
    assert!(line.contains("Executed 10 operations"), "{line}");
    assert!(!line.contains('\n'));
}

#[tokio::test]
async fn zero_ops_only_prepopulates() {
    let backend = FakeBackend::new();
    let report = benchmark("mixed")
        .ops(0)
        .prepopulate(5)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap();

    assert_eq!((report.writes, report.reads), (0, 0));
    assert_eq!(backend.calls().bulk_insert, 1);
    assert_eq!(backend.calls().steady_state(), 0);
}

#[tokio::test]
async fn prepopulation_precedes_reads() {
    let backend = FakeBackend::new();
    let report = benchmark("read")
        .ops(50)
        .prepopulate(3)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap();

    // every read targets one of the three prepopulated records
    assert_eq!(report.reads, 50);
    assert_eq!(report.reads_skipped, 0);
    assert_eq!(report.reads_absent, 0);
    assert_eq!(backend.len(), 3);
    assert_eq!(backend.calls().point_get, 50);
}

#[tokio::test]
async fn short_prepopulation_aborts() {
    let backend = FakeBackend::new().short_bulk_insert(1);
    let err = benchmark("write-heavy")
        .ops(10)
        .prepopulate(3)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap_err();

    let EngineError::PrepopulationFailed {
        requested,
        inserted,
        ..
    } = &err
    else {
        panic!("unexpected error: {err}");
    };
    assert_eq!((*requested, *inserted), (3, 2));
    assert_eq!(err.phase(), Phase::Prepopulating);
    assert!(err.to_string().starts_with("prepopulation failed"));
    assert_eq!(backend.calls().steady_state(), 0);
}

#[tokio::test]
async fn empty_pool_reads_are_counted() {
    let backend = FakeBackend::new();
    let report = benchmark("read")
        .ops(7)
        .prepopulate(0)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap();

    assert_eq!(report.reads, 7);
    assert_eq!(report.reads_skipped, 7);
    assert_eq!(backend.calls().bulk_insert, 0);
    assert_eq!(backend.calls().point_get, 0);
}

#[tokio::test]
async fn sampling_reads_ignore_empty_pool() {
    let backend = FakeBackend::new().sample_reads();
    let report = benchmark("read")
        .ops(4)
        .prepopulate(0)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap();

    assert_eq!(report.reads, 4);
    assert_eq!(report.reads_skipped, 0);
    assert_eq!(report.reads_absent, 4);
    assert_eq!(backend.calls().sample_get, 4);
}

#[tokio::test]
async fn write_failure_is_fatal() {
    let backend = FakeBackend::new().fail_writes_after(2);
    let err = benchmark("write")
        .ops(10)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::WriteFailed { .. }), "{err}");
    assert_eq!(err.phase(), Phase::Running);
    assert!(std::error::Error::source(&err).is_some());
    // no retries after the failed attempt
    assert_eq!(backend.calls().put, 3);
}

#[tokio::test]
async fn read_failure_is_fatal() {
    let backend = FakeBackend::new().fail_reads();
    let err = benchmark("read")
        .ops(10)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::ReadFailed { .. }), "{err}");
    assert!(err.to_string().starts_with("steady-state read failed"));
    assert_eq!(backend.calls().point_get, 1);
}

#[tokio::test]
async fn tolerant_mode_counts_failures() {
    let backend = FakeBackend::new().fail_writes_after(0).fail_reads();
    let report = benchmark("mixed")
        .ops(100)
        .tolerant(true)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap();

    assert_eq!(report.writes + report.reads, 100);
    assert_eq!(report.write_failures, report.writes);
    assert_eq!(report.read_failures, report.reads);
    assert!(report.has_failures());
}

#[tokio::test]
async fn timeout_aborts_run() {
    let backend = FakeBackend::new().with_latency(Duration::from_millis(50));
    let err = benchmark("mixed")
        .ops(1000)
        .timeout(Some(Duration::from_millis(100)))
        .build()
        .unwrap()
        .run(Arc::new(backend))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            EngineError::TimedOut {
                phase: Phase::Running,
                ..
            }
        ),
        "{err}"
    );
}

#[tokio::test]
async fn timeout_covers_prepopulation() {
    let backend = FakeBackend::new().with_bulk_insert_latency(Duration::from_secs(3600));
    let bench = benchmark("mixed")
        .timeout(Some(Duration::from_millis(100)))
        .build()
        .unwrap();
    let run = bench.run(Arc::new(backend.clone()));

    let err = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run must stop at its own deadline")
        .unwrap_err();

    assert!(
        matches!(
            err,
            EngineError::TimedOut {
                phase: Phase::Prepopulating,
                ..
            }
        ),
        "{err}"
    );
    assert_eq!(err.phase(), Phase::Prepopulating);
    assert_eq!(backend.calls().steady_state(), 0);
    assert!(backend.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_run_with_latency() {
    let backend = FakeBackend::new().with_latency(Duration::from_millis(1));
    let report = benchmark("read-heavy")
        .ops(400)
        .concurrency(16)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap();

    assert_eq!(report.writes + report.reads, 400);
    assert_eq!(backend.calls().put, report.writes);
    assert_eq!(backend.calls().point_get, report.reads);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failure_aborts_all_workers() {
    let backend = FakeBackend::new().fail_writes_after(20);
    let err = benchmark("write")
        .ops(100_000)
        .concurrency(8)
        .build()
        .unwrap()
        .run(Arc::new(backend.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::WriteFailed { .. }), "{err}");
    assert!(backend.calls().put < 100_000);
}

#[tokio::test]
async fn mixed_writes_center_on_half() {
    const OPS: u64 = 100_000;
    // binomial standard deviation for p = 0.5 is ~158, allow five of them
    const TOLERANCE: u64 = 800;

    let mut total = 0;
    for seed in 0..5 {
        let report = benchmark("mixed")
            .ops(OPS)
            .seed(seed)
            .build()
            .unwrap()
            .run(Arc::new(FakeBackend::new()))
            .await
            .unwrap();

        assert_eq!(report.writes + report.reads, OPS);
        assert!(
            report.writes.abs_diff(OPS / 2) < TOLERANCE,
            "seed {seed}: {} writes",
            report.writes
        );
        total += report.writes;
    }

    assert!((total / 5).abs_diff(OPS / 2) < TOLERANCE / 2);
}
