use crate::support::helpers::init_tracing;
use anyhow::{anyhow, Result};
use batchpool::{
    BatchItems, BatchPool, CloseOutcome, FailureKind, OutputSink, PoolConfig, PoolError,
};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn fail_on_batch(
    target: u64,
) -> impl Fn(BatchItems<u32>, &OutputSink<usize>, &str) -> Result<()> + Send + Sync + 'static {
    move |items: BatchItems<u32>, output: &OutputSink<usize>, _worker: &str| -> Result<()> {
        if items.seq() == target {
            return Err(anyhow!("value out of range").context("decoding batch"));
        }
        output.push(items.len())?;
        Ok(())
    }
}

#[test]
fn transform_error_loses_one_batch_and_keeps_counters() -> Result<()> {
    init_tracing();
    let pool = BatchPool::new(10, 4, fail_on_batch(3))?;
    for item in 0..100u32 {
        pool.commit(item)?;
    }

    let report = pool.close().into_report().expect("close reports");
    assert_eq!(report.batches_enqueued(), 10);
    assert_eq!(report.batches_completed(), 9, "surviving workers drain the rest");
    assert_eq!(report.items_processed(), 90);

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    let failure = failures[0];
    assert_eq!(failure.kind(), FailureKind::Error);
    assert_eq!(failure.batch(), 3);
    assert_eq!(failure.items(), 10);
    assert!(failure.message().contains("decoding batch"));
    assert!(failure.message().contains("value out of range"));
    assert!(failure.worker().starts_with("batchpool-worker-"));

    let mismatch = report.integrity().unwrap_err();
    assert_eq!(mismatch.batches_enqueued, 10);
    assert_eq!(mismatch.batches_completed, 9);
    assert_eq!(mismatch.items_committed, 100);
    assert_eq!(mismatch.items_processed, 90);
    assert!(!report.is_clean());
    assert!(report.to_string().contains("lost batch 3"));

    assert_eq!(pool.items_committed(), 100, "counters kept after a mismatch");
    assert_eq!(pool.batches_enqueued(), 10);
    assert_eq!(pool.output().drain().iter().sum::<usize>(), 90);
    Ok(())
}

#[test]
fn transform_panic_is_reported_like_an_error() -> Result<()> {
    init_tracing();
    let panicking = |items: BatchItems<u32>, output: &OutputSink<usize>, _worker: &str| -> Result<()> {
        if items.seq() == 0 {
            panic!("index out of bounds in batch zero");
        }
        output.push(items.len())?;
        Ok(())
    };
    let pool = BatchPool::new(5, 2, panicking)?;
    for item in 0..25u32 {
        pool.commit(item)?;
    }

    let report = pool.close().into_report().expect("close reports");
    assert_eq!(report.batches_completed(), 4);
    assert_eq!(report.items_processed(), 20);

    let failure = report.failures().next().expect("one failure");
    assert_eq!(failure.kind(), FailureKind::Panic);
    assert_eq!(failure.batch(), 0);
    assert_eq!(failure.message(), "index out of bounds in batch zero");
    assert!(failure.to_string().contains("panicked"));
    assert!(report.integrity().is_err());
    assert_eq!(pool.snapshot().busy_workers, 0);
    Ok(())
}

#[test]
fn losing_every_worker_fails_commits() -> Result<()> {
    init_tracing();
    let config = PoolConfig::builder()
        .block_size(1)
        .worker_count(1)
        .queue_capacity(1)
        .build()?;
    let pool = BatchPool::with_config(config, fail_on_batch(0));

    let mut refused = None;
    for item in 0..1_000u32 {
        if let Err(error) = pool.commit(item) {
            refused = Some(error);
            break;
        }
    }
    assert!(matches!(refused, Some(PoolError::WorkersExhausted)));
    assert!(!pool.is_running());

    let report = pool.close().into_report().expect("close reports");
    assert_eq!(report.batches_completed(), 0);
    assert_eq!(report.failures().count(), 1);
    assert_eq!(
        report.batches_enqueued(),
        1 + report.stranded_batches() as u64,
        "only the failed batch left the queue"
    );
    assert_eq!(
        report.items_committed(),
        report.batches_enqueued() + report.pending_items() as u64
    );
    assert!(report.integrity().is_err());
    Ok(())
}

#[test]
fn unread_output_overflow_fails_batches_instead_of_hanging_close() -> Result<()> {
    init_tracing();
    let echo = |items: BatchItems<u32>, output: &OutputSink<u32>, _worker: &str| -> Result<()> {
        for item in items {
            output.push(item)?;
        }
        Ok(())
    };
    let config = PoolConfig::builder()
        .block_size(200)
        .worker_count(4)
        .output_capacity(1_024)
        .build()?;
    let pool = BatchPool::with_config(config, echo);

    let (closed_tx, closed_rx) = mpsc::channel::<(CloseOutcome, Vec<u32>)>();
    thread::spawn(move || {
        for item in 0..2_000u32 {
            match pool.commit(item) {
                Ok(()) => {}
                Err(PoolError::WorkersExhausted) => break,
                Err(other) => panic!("unexpected commit error: {other}"),
            }
        }
        let outcome = pool.close();
        let _ = closed_tx.send((outcome, pool.output().drain()));
    });

    let (outcome, delivered) = closed_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("close() returns even though nobody read the output");
    let report = outcome.into_report().expect("close reports");

    assert!(!report.is_clean());
    assert!(report.failures().count() >= 1);
    assert!(report
        .failures()
        .all(|failure| failure.message().contains("output channel is full")));
    assert!(report.items_processed() < 2_000);
    assert_eq!(delivered.len(), 1_024, "channel filled to capacity, nothing more");
    Ok(())
}

#[test]
fn invalid_configuration_names_the_field() {
    let err = PoolConfig::builder()
        .block_size(4)
        .worker_count(0)
        .build()
        .unwrap_err();
    assert_eq!(err.field(), Some("worker_count"));
    assert!(err.to_string().contains("worker_count"));

    let err = PoolConfig::builder()
        .block_size(4)
        .worker_count(2)
        .queue_capacity(0)
        .build()
        .unwrap_err();
    assert_eq!(err.field(), Some("queue_capacity"));
}
