//! Verify command implementation

use anyhow::Result;
use picklebench_buffers::{BufferPool, PoolConfig};
use picklebench_codecs::{Codec, CodecKind};
use picklebench_pickle::Pickler;
use picklebench_testkit::{Order, sample_order};

use crate::commands::CompressionArg;

/// One failed round trip.
#[derive(Debug)]
struct Failure {
    codec: CodecKind,
    variant: String,
    seed: u64,
    reason: String,
}

pub fn run(pool_config: PoolConfig, samples: u64) -> Result<()> {
    let pool = BufferPool::with_config(pool_config);
    let failures = check_all(&pool, samples);
    let checks = samples as usize * CodecKind::ALL.len() * (1 + CompressionArg::ALL.len());

    for failure in &failures {
        println!(
            "FAIL {} {} seed {}: {}",
            failure.codec, failure.variant, failure.seed, failure.reason
        );
    }
    let stats = pool.stats();
    println!(
        "{} of {checks} round trips passed; pool constructed {} buffers for {} rents",
        checks - failures.len(),
        stats.constructed,
        stats.rented
    );

    if !failures.is_empty() {
        anyhow::bail!("{} round trips failed", failures.len());
    }
    Ok(())
}

fn check_all(pool: &BufferPool<u8>, samples: u64) -> Vec<Failure> {
    let mut failures = Vec::new();
    for seed in 0..samples {
        let order = sample_order(seed, (seed as usize * 7) % 64);
        for kind in CodecKind::ALL {
            let codec = kind.codec::<Order>();
            if let Err(reason) = check_plain(codec.as_ref(), &order, pool) {
                failures.push(Failure {
                    codec: kind,
                    variant: "plain".to_string(),
                    seed,
                    reason,
                });
            }
            for compression in CompressionArg::ALL {
                let pickler = Pickler::new(compression.into());
                if let Err(reason) = check_pickled(codec.as_ref(), &order, pool, &pickler) {
                    failures.push(Failure {
                        codec: kind,
                        variant: format!("pickled/{}", compression.name()),
                        seed,
                        reason,
                    });
                }
            }
        }
    }
    failures
}

fn check_plain(
    codec: &dyn Codec<Order>,
    order: &Order,
    pool: &BufferPool<u8>,
) -> std::result::Result<(), String> {
    let buffer = codec.serialize_plain(order, pool).map_err(|e| e.to_string())?;
    let decoded = codec.deserialize_plain(buffer.written());
    pool.return_buffer(buffer);
    compare(order, decoded)
}

fn check_pickled(
    codec: &dyn Codec<Order>,
    order: &Order,
    pool: &BufferPool<u8>,
    pickler: &Pickler,
) -> std::result::Result<(), String> {
    let frame = codec
        .serialize_pickled(order, pool, pickler)
        .map_err(|e| e.to_string())?;
    let decoded = codec.deserialize_pickled(frame.written(), pool, pickler);
    pool.return_buffer(frame);
    compare(order, decoded)
}

fn compare(
    expected: &Order,
    decoded: picklebench_common::Result<Order>,
) -> std::result::Result<(), String> {
    match decoded {
        Ok(value) if &value == expected => Ok(()),
        Ok(_) => Err("decoded value differs from the original".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use picklebench_buffers::BufferOptions;

    use super::*;

    #[test]
    fn test_all_round_trips_pass() {
        let pool = BufferPool::new();
        assert!(check_all(&pool, 3).is_empty());
        let stats = pool.stats();
        assert_eq!(stats.returned, stats.rented);
    }

    #[test]
    fn test_failures_are_reported() {
        let config = PoolConfig::default()
            .with_buffer_options(BufferOptions::default().with_max_capacity(300));
        // Seed 5 has 35 line items, far beyond 300 bytes in every codec.
        let failures = check_all(&BufferPool::with_config(config), 6);
        assert!(failures.iter().any(|f| f.seed == 5 && f.codec == CodecKind::Json));
        assert!(run(
            PoolConfig::default().with_buffer_options(BufferOptions::default().with_max_capacity(300)),
            6
        )
        .is_err());
    }
}
