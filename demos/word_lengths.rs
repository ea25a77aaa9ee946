use std::collections::BTreeMap;
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::str::FromStr;
use std::thread;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use batchpool::{BatchItems, BatchPool, OutputSink, PoolConfig};

const DEFAULT_BLOCK_SIZE: usize = 200;
const DEFAULT_WORKERS: usize = 20;
const DEFAULT_LOG_DIRECTIVE: &str = "warn";

/// Counts words by length, one histogram per batch.
fn count_word_lengths(
    lines: BatchItems<String>,
    output: &OutputSink<BTreeMap<usize, usize>>,
    _worker: &str,
) -> Result<()> {
    let mut histogram = BTreeMap::new();
    for line in lines {
        for word in line.split_whitespace() {
            *histogram.entry(word.chars().count()).or_insert(0) += 1;
        }
    }
    output.push_blocking(histogram)?;
    Ok(())
}

fn main() -> Result<()> {
    init_example_tracing();

    let args = ExampleArgs::from_env()?;
    let config = PoolConfig::builder()
        .block_size(args.block_size)
        .worker_count(args.workers)
        .build()?;
    let pool = BatchPool::with_config(config, count_word_lengths);

    // Merge results while lines are still being committed so the bounded
    // output channel never stalls the workers.
    let output = pool.output();
    let merger = thread::spawn(move || {
        let mut totals = BTreeMap::new();
        while let Some(histogram) = output.blocking_recv() {
            for (len, count) in histogram {
                *totals.entry(len).or_insert(0usize) += count;
            }
        }
        totals
    });

    let started = Instant::now();
    let reader = args.open_input()?;
    for line in reader.lines() {
        pool.commit(line.context("failed to read input line")?)?;
    }

    let outcome = pool.close();
    let totals = merger
        .join()
        .map_err(|_| anyhow::anyhow!("merge thread panicked"))?;

    if let Some(report) = outcome.report() {
        println!("{report}");
        report.integrity().context("some batches were lost")?;
    }

    println!("word length histogram ({:.2?}):", started.elapsed());
    for (len, count) in &totals {
        println!("{len:>4} {count}");
    }
    Ok(())
}

fn init_example_tracing() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", DEFAULT_LOG_DIRECTIVE);
    }
    batchpool::init_tracing();
}

struct ExampleArgs {
    path: Option<String>,
    block_size: usize,
    workers: usize,
}

impl ExampleArgs {
    fn from_env() -> Result<Self> {
        let path = env::args().nth(1);
        let block_size = parse_env_with_default("BATCHPOOL_BLOCK_SIZE", DEFAULT_BLOCK_SIZE)?;
        let workers = parse_env_with_default("BATCHPOOL_WORKERS", DEFAULT_WORKERS)?;
        ensure!(workers > 0, "BATCHPOOL_WORKERS must be greater than 0");

        Ok(Self {
            path,
            block_size,
            workers,
        })
    }

    /// Reads the file named on the command line, or stdin when none is given.
    fn open_input(&self) -> Result<Box<dyn BufRead>> {
        match &self.path {
            Some(path) => {
                let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
                Ok(Box::new(BufReader::new(file)))
            }
            None => Ok(Box::new(BufReader::new(io::stdin()))),
        }
    }
}

fn parse_env_with_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {value}")),
        Err(_) => Ok(default),
    }
}
