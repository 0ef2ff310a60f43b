use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

use commands::{CodecArg, CompressionArg, VariantArg};

#[derive(Parser)]
#[command(name = "picklebench-cmd")]
#[command(about = "Compare serialization codecs over pooled, optionally pickled buffers")]
#[command(version)]
struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Buffer pool configuration: inline JSON or a path to a JSON file
    #[arg(long, global = true)]
    pool_config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print plain and pickled sizes of the test value for every codec
    Sizes {
        /// Number of line items in the test value
        #[arg(long, default_value_t = 32)]
        items: usize,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run timed serialize and deserialize loops against a shared pool
    Run {
        #[arg(long, value_enum, default_value_t = CodecArg::All)]
        codec: CodecArg,

        #[arg(long, value_enum, default_value_t = VariantArg::Plain)]
        variant: VariantArg,

        /// Serialize/deserialize iterations per thread
        #[arg(short = 'n', long, default_value_t = 10_000)]
        iterations: usize,

        /// Compression applied by the pickled variant
        #[arg(long, value_enum, default_value_t = CompressionArg::Lz4)]
        compression: CompressionArg,

        /// Number of threads sharing the pool
        #[arg(short, long, default_value_t = 1)]
        threads: usize,
    },

    /// Round-trip every codec and variant and report mismatches
    Verify {
        /// Number of distinct values to check
        #[arg(long, default_value_t = 8)]
        samples: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose);
    let pool_config = utils::load_pool_config(cli.pool_config.as_deref())?;

    match cli.command {
        Commands::Sizes { items, json } => commands::sizes::run(pool_config, items, json),
        Commands::Run {
            codec,
            variant,
            iterations,
            compression,
            threads,
        } => commands::run::run(
            pool_config,
            commands::run::RunOptions {
                codecs: codec.kinds(),
                variant,
                iterations,
                compression: compression.into(),
                threads,
            },
        ),
        Commands::Verify { samples } => commands::verify::run(pool_config, samples),
    }
}
