use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use batchpool::{BatchItems, BatchTransform, OutputSink};
use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

/// Deterministic text lines of varying length.
pub fn sample_lines(count: usize) -> Vec<String> {
    const WORDS: [&str; 8] = [
        "quill", "ink", "parchment", "a", "scribe", "letters", "to", "manuscript",
    ];
    (0..count)
        .map(|index| {
            let words = 1 + index % 5;
            (0..words)
                .map(|offset| WORDS[(index + offset * 3) % WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// One transform call as seen from inside the transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord<T> {
    pub worker: String,
    pub seq: u64,
    pub items: Vec<T>,
}

/// Records every batch it receives and echoes each item to the output.
pub struct RecordingTransform<T> {
    records: Arc<Mutex<Vec<BatchRecord<T>>>>,
}

impl<T> RecordingTransform<T> {
    pub fn new() -> (Self, Arc<Mutex<Vec<BatchRecord<T>>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                records: records.clone(),
            },
            records,
        )
    }
}

impl<T> BatchTransform<T, T> for RecordingTransform<T>
where
    T: Clone + Send + 'static,
{
    fn on_batch(&self, items: BatchItems<T>, output: &OutputSink<T>, worker: &str) -> Result<()> {
        let seq = items.seq();
        let items: Vec<T> = items.collect();
        for item in &items {
            output.push(item.clone())?;
        }
        self.records.lock().unwrap().push(BatchRecord {
            worker: worker.to_string(),
            seq,
            items,
        });
        Ok(())
    }
}

/// Counts committed lines by their length into a shared map.
pub struct LineLengthCounter {
    counts: Arc<Mutex<BTreeMap<usize, usize>>>,
}

impl LineLengthCounter {
    pub fn new() -> (Self, Arc<Mutex<BTreeMap<usize, usize>>>) {
        let counts = Arc::new(Mutex::new(BTreeMap::new()));
        (
            Self {
                counts: counts.clone(),
            },
            counts,
        )
    }
}

impl BatchTransform<String, usize> for LineLengthCounter {
    fn on_batch(
        &self,
        items: BatchItems<String>,
        output: &OutputSink<usize>,
        _worker: &str,
    ) -> Result<()> {
        let mut local = BTreeMap::new();
        let mut seen = 0usize;
        for line in items {
            *local.entry(line.len()).or_insert(0usize) += 1;
            seen += 1;
        }

        let mut counts = self.counts.lock().unwrap();
        for (len, count) in local {
            *counts.entry(len).or_insert(0) += count;
        }
        drop(counts);

        output.push(seen)?;
        Ok(())
    }
}

pub fn ceil_div(numerator: usize, denominator: usize) -> u64 {
    numerator.div_ceil(denominator) as u64
}
