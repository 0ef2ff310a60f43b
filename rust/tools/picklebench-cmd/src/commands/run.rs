//! Run command implementation

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use picklebench_buffers::{BufferPool, PoolConfig};
use picklebench_codecs::{Codec, CodecKind};
use picklebench_pickle::{Compression, Pickler};
use picklebench_testkit::{Order, test_value};

use crate::commands::VariantArg;

pub struct RunOptions {
    pub codecs: Vec<CodecKind>,
    pub variant: VariantArg,
    pub iterations: usize,
    pub compression: Compression,
    pub threads: usize,
}

pub fn run(pool_config: PoolConfig, options: RunOptions) -> Result<()> {
    anyhow::ensure!(options.threads > 0, "--threads must be at least 1");
    anyhow::ensure!(options.iterations > 0, "--iterations must be at least 1");

    let pool = BufferPool::with_config(pool_config);
    let pickler = Pickler::new(options.compression);
    let value = test_value();
    let total_ops = options.iterations * options.threads;

    println!(
        "{:?} variant, {} iterations x {} threads",
        options.variant, options.iterations, options.threads
    );
    for &kind in &options.codecs {
        let codec = kind.codec::<Order>();
        let bench = Bench {
            codec: codec.as_ref(),
            pool: &pool,
            pickler: &pickler,
            variant: options.variant,
            value: &value,
        };
        let encoded = bench
            .encode_once()
            .with_context(|| format!("{kind} serialization failed"))?;

        let serialize = timed(options.threads, || bench.serialize_loop(options.iterations))?;
        let deserialize = timed(options.threads, || {
            bench.deserialize_loop(&encoded, options.iterations)
        })?;

        println!(
            "{:<10} {:>8} bytes  serialize {:>10.1} ns/op  deserialize {:>10.1} ns/op",
            kind.name(),
            encoded.len(),
            per_op(serialize, total_ops),
            per_op(deserialize, total_ops),
        );
    }

    let stats = pool.stats();
    println!(
        "pool: constructed {}, rented {}, reused {}, returned {}, discarded {}, idle {}",
        stats.constructed,
        stats.rented,
        stats.reused(),
        stats.returned,
        stats.discarded,
        stats.idle
    );
    Ok(())
}

struct Bench<'a> {
    codec: &'a dyn Codec<Order>,
    pool: &'a BufferPool<u8>,
    pickler: &'a Pickler,
    variant: VariantArg,
    value: &'a Order,
}

impl Bench<'_> {
    fn encode_once(&self) -> Result<Vec<u8>> {
        let buffer = self.serialize()?;
        let bytes = buffer.written().to_vec();
        self.pool.return_buffer(buffer);
        Ok(bytes)
    }

    fn serialize(&self) -> picklebench_common::Result<picklebench_buffers::GrowableBuffer<u8>> {
        match self.variant {
            VariantArg::Plain => self.codec.serialize_plain(self.value, self.pool),
            VariantArg::Pickled => self
                .codec
                .serialize_pickled(self.value, self.pool, self.pickler),
        }
    }

    fn serialize_loop(&self, iterations: usize) -> Result<()> {
        for _ in 0..iterations {
            let buffer = self.serialize()?;
            self.pool.return_buffer(std::hint::black_box(buffer));
        }
        Ok(())
    }

    fn deserialize_loop(&self, bytes: &[u8], iterations: usize) -> Result<()> {
        for _ in 0..iterations {
            let value = match self.variant {
                VariantArg::Plain => self.codec.deserialize_plain(bytes)?,
                VariantArg::Pickled => {
                    self.codec
                        .deserialize_pickled(bytes, self.pool, self.pickler)?
                }
            };
            std::hint::black_box(value);
        }
        Ok(())
    }
}

/// Runs `work` on `threads` scoped threads and returns the wall time.
fn timed<F>(threads: usize, work: F) -> Result<Duration>
where
    F: Fn() -> Result<()> + Sync,
{
    let start = Instant::now();
    std::thread::scope(|s| {
        let handles = (0..threads).map(|_| s.spawn(&work)).collect::<Vec<_>>();
        handles.into_iter().try_for_each(|handle| {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("benchmark thread panicked"))?
        })
    })?;
    let elapsed = start.elapsed();
    log::debug!("{threads} threads finished in {elapsed:?}");
    Ok(elapsed)
}

fn per_op(elapsed: Duration, ops: usize) -> f64 {
    elapsed.as_nanos() as f64 / ops as f64
}
