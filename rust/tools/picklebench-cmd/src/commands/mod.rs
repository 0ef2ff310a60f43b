//! Command implementations for picklebench-cmd

use clap::ValueEnum;
use picklebench_codecs::CodecKind;
use picklebench_pickle::Compression;

pub mod run;
pub mod sizes;
pub mod verify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CodecArg {
    Bincode,
    /// bincode with built-in zstd compression
    BincodeZstd,
    Json,
    Protobuf,
    All,
}

impl CodecArg {
    pub fn kinds(self) -> Vec<CodecKind> {
        match self {
            CodecArg::Bincode => vec![CodecKind::Bincode],
            CodecArg::BincodeZstd => vec![CodecKind::BincodeZstd],
            CodecArg::Json => vec![CodecKind::Json],
            CodecArg::Protobuf => vec![CodecKind::Protobuf],
            CodecArg::All => CodecKind::ALL.to_vec(),
        }
    }
}

/// Whether the serialized bytes are wrapped in a compressed pickle frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VariantArg {
    Plain,
    Pickled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompressionArg {
    Lz4,
    Lz4Hc,
    Zstd,
}

impl CompressionArg {
    pub const ALL: [CompressionArg; 3] =
        [CompressionArg::Lz4, CompressionArg::Lz4Hc, CompressionArg::Zstd];

    pub fn name(self) -> &'static str {
        match self {
            CompressionArg::Lz4 => "lz4",
            CompressionArg::Lz4Hc => "lz4-hc",
            CompressionArg::Zstd => "zstd",
        }
    }
}

impl From<CompressionArg> for Compression {
    fn from(arg: CompressionArg) -> Compression {
        match arg {
            CompressionArg::Lz4 => Compression::lz4(),
            CompressionArg::Lz4Hc => Compression::lz4_high_compression(),
            CompressionArg::Zstd => Compression::zstd(),
        }
    }
}
