//! Sizes command implementation

use anyhow::{Context, Result};
use picklebench_buffers::{BufferPool, PoolConfig};
use picklebench_codecs::CodecKind;
use picklebench_pickle::Pickler;
use picklebench_testkit::{Order, sample_order};
use serde::Serialize;

use crate::{commands::CompressionArg, utils::format_size};

#[derive(Serialize)]
struct SizeRow {
    codec: &'static str,
    plain: usize,
    pickled: Vec<PickledSize>,
}

#[derive(Serialize)]
struct PickledSize {
    compression: &'static str,
    size: usize,
}

pub fn run(pool_config: PoolConfig, items: usize, json: bool) -> Result<()> {
    let pool = BufferPool::with_config(pool_config);
    let order = sample_order(0, items);

    let rows = CodecKind::ALL
        .into_iter()
        .map(|kind| measure(kind, &order, &pool))
        .collect::<Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Test value: order with {items} line items");
    print!("{:<10} {:>12}", "codec", "plain");
    for compression in CompressionArg::ALL {
        print!(" {:>12}", compression.name());
    }
    println!();
    for row in &rows {
        print!("{:<10} {:>12}", row.codec, format_size(row.plain));
        for pickled in &row.pickled {
            print!(" {:>12}", format_size(pickled.size));
        }
        println!();
    }
    Ok(())
}

fn measure(kind: CodecKind, order: &Order, pool: &BufferPool<u8>) -> Result<SizeRow> {
    let codec = kind.codec::<Order>();
    let plain = codec
        .serialize_plain(order, pool)
        .with_context(|| format!("{kind} serialization failed"))?;
    let plain_len = plain.written_count();
    pool.return_buffer(plain);

    let mut pickled = Vec::with_capacity(CompressionArg::ALL.len());
    for compression in CompressionArg::ALL {
        let pickler = Pickler::new(compression.into());
        let frame = codec
            .serialize_pickled(order, pool, &pickler)
            .with_context(|| format!("{kind} pickling with {} failed", compression.name()))?;
        pickled.push(PickledSize {
            compression: compression.name(),
            size: frame.written_count(),
        });
        pool.return_buffer(frame);
    }

    Ok(SizeRow {
        codec: codec.name(),
        plain: plain_len,
        pickled,
    })
}
