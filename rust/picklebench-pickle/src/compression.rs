//! The two-way byte transforms used by the pickler. Each compressor appends
//! its output to a `GrowableBuffer<u8>` through the writable-tail protocol.

use std::io::{Read, Write};

use picklebench_buffers::GrowableBuffer;
use picklebench_common::{Error, Result, verify_data};
use serde::{Deserialize, Serialize};

/// Compression method recorded in the pickle frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    /// Payload holds the raw bytes.
    Stored = 0,
    Lz4 = 1,
    Zstd = 2,
}

impl Method {
    pub fn from_bits(bits: u8) -> Option<Method> {
        match bits {
            0 => Some(Method::Stored),
            1 => Some(Method::Lz4),
            2 => Some(Method::Zstd),
            _ => None,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lz4CompressionMode {
    #[default]
    Fast,
    HighCompression,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lz4Parameters {
    pub mode: Lz4CompressionMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZstdParameters {
    pub level: i32,
}

impl Default for ZstdParameters {
    fn default() -> Self {
        ZstdParameters {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Which transform the pickler applies, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Compression {
    Lz4(Lz4Parameters),
    Zstd(ZstdParameters),
}

impl Compression {
    pub fn lz4() -> Compression {
        Compression::Lz4(Lz4Parameters::default())
    }

    pub fn lz4_high_compression() -> Compression {
        Compression::Lz4(Lz4Parameters {
            mode: Lz4CompressionMode::HighCompression,
        })
    }

    pub fn zstd() -> Compression {
        Compression::Zstd(ZstdParameters::default())
    }

    pub fn method(&self) -> Method {
        match self {
            Compression::Lz4(_) => Method::Lz4,
            Compression::Zstd(_) => Method::Zstd,
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Compression::lz4()
    }
}

pub trait Compressor: Sync + Send {
    /// The method recorded in the frame header for this compressor's output.
    fn method(&self) -> Method;

    /// Upper bound on the compressed size of `len` input bytes.
    fn compress_bound(&self, len: usize) -> Result<usize>;

    /// Compresses `bytes` and appends the result to `target`.
    fn compress(&self, bytes: &[u8], target: &mut GrowableBuffer<u8>) -> Result<()>;

    /// Decompresses `encoded`, which must expand to exactly
    /// `uncompressed_len` bytes, and appends the result to `target`.
    ///
    /// # Arguments
    ///
    /// * `encoded` - The compressed payload of a frame.
    /// * `uncompressed_len` - The size the frame header declares. It is not
    ///   trusted: a size that cannot fit under the target's `max_capacity`
    ///   is `CorruptData`, and the target grows only as output is produced.
    /// * `target` - Receives the decompressed bytes after its written data.
    ///
    /// # Returns
    ///
    /// `CorruptData` for malformed payloads or size mismatches. On error the
    /// target may hold partial output; the caller truncates it.
    fn decompress(
        &self,
        encoded: &[u8],
        uncompressed_len: usize,
        target: &mut GrowableBuffer<u8>,
    ) -> Result<()>;
}

/// Checks a declared uncompressed size against the room left in `target`
/// and returns the written count the target must reach.
fn declared_end(
    element: &str,
    uncompressed_len: usize,
    target: &GrowableBuffer<u8>,
) -> Result<usize> {
    let limit = target.options().max_capacity;
    match target.written_count().checked_add(uncompressed_len) {
        Some(end) if end <= limit => Ok(end),
        _ => Err(Error::corrupt_data(
            element,
            format!("declared size {uncompressed_len} exceeds the buffer limit {limit}"),
        )),
    }
}

/// LZ4 block compression.
#[derive(Default)]
pub struct Lz4Compressor {
    parameters: Lz4Parameters,
}

/// LZ4 cannot expand data by more than this factor.
const LZ4_MAX_RATIO: usize = 255;

impl Lz4Compressor {
    pub fn new(parameters: Lz4Parameters) -> Lz4Compressor {
        Lz4Compressor { parameters }
    }
}

impl Compressor for Lz4Compressor {
    fn method(&self) -> Method {
        Method::Lz4
    }

    fn compress_bound(&self, len: usize) -> Result<usize> {
        lz4::block::compress_bound(len).map_err(|e| Error::io("Failed to compute LZ4 bound", e))
    }

    fn compress(&self, bytes: &[u8], target: &mut GrowableBuffer<u8>) -> Result<()> {
        let compression_mode = match self.parameters.mode {
            Lz4CompressionMode::Fast => lz4::block::CompressionMode::FAST(1),
            Lz4CompressionMode::HighCompression => lz4::block::CompressionMode::HIGHCOMPRESSION(9),
        };

        let max_compressed_size = self.compress_bound(bytes.len())?;
        let enc_buffer = target.writable_tail(max_compressed_size)?;
        let size = lz4::block::compress_to_buffer(bytes, Some(compression_mode), false, enc_buffer)
            .map_err(|e| Error::io("Failed to compress block with LZ4", e))?;
        target.advance(size)
    }

    fn decompress(
        &self,
        encoded: &[u8],
        uncompressed_len: usize,
        target: &mut GrowableBuffer<u8>,
    ) -> Result<()> {
        verify_data!(
            lz4_payload,
            uncompressed_len <= encoded.len().saturating_mul(LZ4_MAX_RATIO) + 16
        );
        declared_end("lz4 payload", uncompressed_len, target)?;
        let expected = i32::try_from(uncompressed_len)
            .map_err(|_| Error::corrupt_data("lz4 payload", "uncompressed size out of range"))?;

        target.reserve(uncompressed_len)?;
        let mut nothing: [u8; 0] = [];
        let dec_buffer: &mut [u8] = if uncompressed_len == 0 {
            &mut nothing
        } else {
            &mut target.writable_tail(uncompressed_len)?[..uncompressed_len]
        };
        let decompressed_size = lz4::block::decompress_to_buffer(encoded, Some(expected), dec_buffer)
            .map_err(|e| Error::corrupt_data("lz4 payload", e.to_string()))?;

        if decompressed_size != uncompressed_len {
            return Err(Error::corrupt_data(
                "lz4 payload",
                "LZ4 decompressed size mismatch",
            ));
        }
        target.advance(decompressed_size)
    }
}

/// Zstandard stream compression.
#[derive(Default)]
pub struct ZstdCompressor {
    parameters: ZstdParameters,
}

/// Largest step by which the zstd decoder grows its target at once.
const ZSTD_DECODE_CHUNK: usize = 64 * 1024;

impl ZstdCompressor {
    pub fn new(parameters: ZstdParameters) -> ZstdCompressor {
        ZstdCompressor { parameters }
    }
}

impl Compressor for ZstdCompressor {
    fn method(&self) -> Method {
        Method::Zstd
    }

    fn compress_bound(&self, len: usize) -> Result<usize> {
        Ok(zstd::zstd_safe::compress_bound(len))
    }

    fn compress(&self, bytes: &[u8], target: &mut GrowableBuffer<u8>) -> Result<()> {
        let mut zstd = zstd::stream::write::Encoder::new(&mut *target, self.parameters.level)
            .map_err(|e| Error::io("Failed to create ZSTD encoder", e))?;
        zstd.write_all(bytes)?;
        zstd.finish()?;
        Ok(())
    }

    fn decompress(
        &self,
        encoded: &[u8],
        uncompressed_len: usize,
        target: &mut GrowableBuffer<u8>,
    ) -> Result<()> {
        let end = declared_end("zstd payload", uncompressed_len, target)?;
        let mut zstd = zstd::stream::read::Decoder::new(encoded)
            .map_err(|e| Error::corrupt_data("zstd payload", e.to_string()))?;

        while target.written_count() < end {
            let remaining = end - target.written_count();
            if target.free_capacity() == 0 {
                target.reserve(remaining.min(ZSTD_DECODE_CHUNK))?;
            }
            let tail = target.writable_tail(1)?;
            let len = tail.len().min(remaining);
            let size = read_payload(&mut zstd, &mut tail[..len])?;
            if size == 0 {
                break;
            }
            target.advance(size)?;
        }

        if target.written_count() != end {
            return Err(Error::corrupt_data(
                "zstd payload",
                "ZSTD decompressed size mismatch",
            ));
        }
        let mut overflow = [0u8; 1];
        if read_payload(&mut zstd, &mut overflow)? != 0 {
            return Err(Error::corrupt_data(
                "zstd payload",
                "ZSTD payload expands past the declared size",
            ));
        }
        Ok(())
    }
}

fn read_payload(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(size) => return Ok(size),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::corrupt_data("zstd payload", e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use picklebench_buffers::BufferOptions;

    use super::*;

    fn compressible(len: usize) -> Vec<u8> {
        (0..len).map(|i| b"abcdefgh"[(i / 7) % 8]).collect()
    }

    fn compressors() -> Vec<Box<dyn Compressor>> {
        vec![
            Box::new(Lz4Compressor::default()),
            Box::new(Lz4Compressor::new(Lz4Parameters {
                mode: Lz4CompressionMode::HighCompression,
            })),
            Box::new(ZstdCompressor::default()),
        ]
    }

    #[test]
    fn test_round_trip() {
        let data = compressible(100_000);
        for compressor in compressors() {
            let mut encoded = GrowableBuffer::new();
            compressor.compress(&data, &mut encoded).unwrap();
            assert!(encoded.written_count() < data.len() / 4);

            let mut decoded = GrowableBuffer::new();
            compressor
                .decompress(encoded.written(), data.len(), &mut decoded)
                .unwrap();
            assert_eq!(decoded.written(), data.as_slice());
        }
    }

    #[test]
    fn test_appends_after_existing_data() {
        let data = compressible(5000);
        for compressor in compressors() {
            let mut encoded = GrowableBuffer::new();
            encoded.write_all(b"prefix").unwrap();
            compressor.compress(&data, &mut encoded).unwrap();
            assert_eq!(&encoded.written()[..6], b"prefix");

            let mut decoded = GrowableBuffer::new();
            decoded.write_all(b"xy").unwrap();
            compressor
                .decompress(&encoded.written()[6..], data.len(), &mut decoded)
                .unwrap();
            assert_eq!(&decoded.written()[..2], b"xy");
            assert_eq!(&decoded.written()[2..], data.as_slice());
        }
    }

    #[test]
    fn test_size_mismatch_is_corrupt() {
        let data = compressible(4096);
        for compressor in compressors() {
            let mut encoded = GrowableBuffer::new();
            compressor.compress(&data, &mut encoded).unwrap();

            let mut decoded = GrowableBuffer::new();
            let err = compressor
                .decompress(encoded.written(), data.len() + 1, &mut decoded)
                .unwrap_err();
            assert!(err.is_corrupt_data(), "{err}");

            let mut decoded = GrowableBuffer::new();
            let err = compressor
                .decompress(encoded.written(), data.len() - 1, &mut decoded)
                .unwrap_err();
            assert!(err.is_corrupt_data(), "{err}");
        }
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let mut rng = fastrand::Rng::with_seed(3);
        let garbage: Vec<u8> = (0..300).map(|_| rng.u8(..)).collect();
        for compressor in compressors() {
            let mut decoded = GrowableBuffer::new();
            let err = compressor
                .decompress(&garbage, 1000, &mut decoded)
                .unwrap_err();
            assert!(err.is_corrupt_data(), "{err}");
        }
    }

    #[test]
    fn test_declared_size_beyond_limit_is_corrupt() {
        let data = compressible(4096);
        for compressor in compressors() {
            let mut encoded = GrowableBuffer::new();
            compressor.compress(&data, &mut encoded).unwrap();

            let mut decoded = GrowableBuffer::new();
            let err = compressor
                .decompress(encoded.written(), u32::MAX as usize, &mut decoded)
                .unwrap_err();
            assert!(err.is_corrupt_data(), "{err}");
            assert!(!decoded.is_poisoned());
            assert_eq!(decoded.capacity(), 0);

            let options = BufferOptions::default().with_max_capacity(4000);
            let mut small = GrowableBuffer::with_options(options);
            let err = compressor
                .decompress(encoded.written(), data.len(), &mut small)
                .unwrap_err();
            assert!(err.is_corrupt_data(), "{err}");
            assert!(!small.is_poisoned());
        }
    }

    #[test]
    fn test_inflated_declared_size_does_not_allocate_it() {
        let data = compressible(100);
        let compressor = ZstdCompressor::default();
        let mut encoded = GrowableBuffer::new();
        compressor.compress(&data, &mut encoded).unwrap();

        let mut decoded = GrowableBuffer::new();
        let err = compressor
            .decompress(encoded.written(), 200_000_000, &mut decoded)
            .unwrap_err();
        assert!(err.is_corrupt_data(), "{err}");
        assert!(!decoded.is_poisoned());
        assert!(decoded.capacity() <= ZSTD_DECODE_CHUNK);
    }

    #[test]
    fn test_zstd_decode_grows_up_to_the_limit() {
        // Doubling from 65536 would overshoot a 100_000 limit; the decoder
        // must still fit 90_000 bytes.
        let data = compressible(90_000);
        let compressor = ZstdCompressor::default();
        let mut encoded = GrowableBuffer::new();
        compressor.compress(&data, &mut encoded).unwrap();

        let options = BufferOptions::default().with_max_capacity(100_000);
        let mut decoded = GrowableBuffer::with_options(options);
        compressor
            .decompress(encoded.written(), data.len(), &mut decoded)
            .unwrap();
        assert_eq!(decoded.written(), data.as_slice());
        assert!(decoded.capacity() <= 100_000);
    }

    #[test]
    fn test_compress_bound_covers_output() {
        let mut rng = fastrand::Rng::with_seed(11);
        let data: Vec<u8> = (0..2000).map(|_| rng.u8(..)).collect();
        for compressor in compressors() {
            let bound = compressor.compress_bound(data.len()).unwrap();
            assert!(bound >= data.len());
            let mut encoded = GrowableBuffer::new();
            compressor.compress(&data, &mut encoded).unwrap();
            assert!(encoded.written_count() <= bound);
            assert_ne!(compressor.method(), Method::Stored);
        }
    }

    #[test]
    fn test_method_bits() {
        for method in [Method::Stored, Method::Lz4, Method::Zstd] {
            assert_eq!(Method::from_bits(method as u8), Some(method));
        }
        assert_eq!(Method::from_bits(3), None);
        assert_eq!(Compression::default().method(), Method::Lz4);
        assert_eq!(Compression::zstd().method(), Method::Zstd);
    }

    #[test]
    fn test_compression_serde() {
        let json = serde_json::to_string(&Compression::lz4_high_compression()).unwrap();
        assert_eq!(json, r#"{"method":"lz4","mode":"high_compression"}"#);
        let parsed: Compression = serde_json::from_str(r#"{"method":"zstd","level":7}"#).unwrap();
        assert_eq!(parsed, Compression::Zstd(ZstdParameters { level: 7 }));
    }
}
