use crate::support::helpers::{ceil_div, init_tracing, BatchRecord, RecordingTransform};
use anyhow::Result;
use batchpool::BatchPool;

const GRID: &[(usize, usize, usize)] = &[
    (0, 4, 2),
    (1, 1, 1),
    (7, 3, 2),
    (64, 8, 8),
    (100, 7, 3),
    (250, 200, 20),
    (999, 10, 4),
    (1000, 1000, 1),
    (1000, 33, 16),
];

fn run_grid_point(items: usize, block_size: usize, workers: usize) -> Result<Vec<BatchRecord<u32>>> {
    let (transform, records) = RecordingTransform::new();
    let pool = BatchPool::new(block_size, workers, transform)?;
    for item in 0..items as u32 {
        pool.commit(item)?;
    }

    let report = pool.close().into_report().expect("close reports");
    assert!(report.is_clean(), "N={items} B={block_size} W={workers}: {report}");
    assert_eq!(report.items_processed(), items as u64);
    assert_eq!(report.batches_enqueued(), ceil_div(items, block_size));

    let mut echoed = pool.output().drain();
    echoed.sort_unstable();
    assert_eq!(echoed, (0..items as u32).collect::<Vec<_>>());

    let records = std::mem::take(&mut *records.lock().unwrap());
    Ok(records)
}

#[test]
fn every_item_is_processed_exactly_once() -> Result<()> {
    init_tracing();
    for &(items, block_size, workers) in GRID {
        let records = run_grid_point(items, block_size, workers)?;
        assert_eq!(records.len() as u64, ceil_div(items, block_size));

        let mut seen: Vec<u32> = records.iter().flat_map(|r| r.items.iter().copied()).collect();
        seen.sort_unstable();
        assert_eq!(
            seen,
            (0..items as u32).collect::<Vec<_>>(),
            "N={items} B={block_size} W={workers}: no drops, no duplicates"
        );
    }
    Ok(())
}

#[test]
fn batches_are_full_except_the_last() -> Result<()> {
    init_tracing();
    for &(items, block_size, workers) in GRID {
        let mut records = run_grid_point(items, block_size, workers)?;
        records.sort_by_key(|record| record.seq);

        let expected_seqs: Vec<u64> = (0..records.len() as u64).collect();
        assert_eq!(
            records.iter().map(|record| record.seq).collect::<Vec<_>>(),
            expected_seqs
        );

        for (index, record) in records.iter().enumerate() {
            let is_last = index + 1 == records.len();
            if is_last && items % block_size != 0 {
                assert_eq!(record.items.len(), items % block_size);
            } else {
                assert_eq!(record.items.len(), block_size, "batch {index} must be full");
            }
        }
    }
    Ok(())
}

#[test]
fn batch_contents_follow_commit_order() -> Result<()> {
    init_tracing();
    for &(items, block_size, workers) in GRID {
        for record in run_grid_point(items, block_size, workers)? {
            let first = record.seq as u32 * block_size as u32;
            let expected: Vec<u32> = (first..first + record.items.len() as u32).collect();
            assert_eq!(
                record.items, expected,
                "batch {} in N={items} B={block_size} W={workers}",
                record.seq
            );
            assert!(record.worker.starts_with("batchpool-worker-"));
        }
    }
    Ok(())
}

#[test]
fn work_spreads_over_workers_without_exceeding_the_pool() -> Result<()> {
    init_tracing();
    let workers = 4;
    let records = run_grid_point(400, 1, workers)?;

    let mut names: Vec<&str> = records.iter().map(|r| r.worker.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert!(!names.is_empty());
    assert!(names.len() <= workers);
    for name in names {
        let index: usize = name
            .strip_prefix("batchpool-worker-")
            .expect("default worker prefix")
            .parse()?;
        assert!(index < workers);
    }
    Ok(())
}
