//! The compression wrap ("pickling") applied on top of any serializer's output.
//!
//! A pickle frame is a 5-byte header (version, method, uncompressed length)
//! followed by the LZ4/Zstd-compressed payload, or the raw bytes when
//! compression does not pay off. See [`frame`] for the layout.

pub mod compression;
pub mod frame;
pub mod pickler;

pub use compression::{
    Compression, Compressor, Lz4CompressionMode, Lz4Compressor, Lz4Parameters, Method,
    ZstdCompressor, ZstdParameters,
};
pub use pickler::{Pickler, compress, decompress};
