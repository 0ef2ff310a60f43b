use picklebench_buffers::{BufferPool, GrowableBuffer};
use picklebench_common::{Error, Result};

use crate::{
    compression::{Compression, Compressor, Lz4Compressor, Method, ZstdCompressor},
    frame::{FrameHeader, HEADER_LEN},
};

/// Wraps serialized bytes in a compressed pickle frame and unwraps them again,
/// round-tripping buffers through a [`BufferPool`].
///
/// Frames record their compression method, so any `Pickler` can unpickle
/// frames produced by any other, whatever its own `Compression` setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pickler {
    compression: Compression,
}

impl Pickler {
    pub fn new(compression: Compression) -> Pickler {
        Pickler { compression }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Compresses the written contents of `source` into a buffer rented from
    /// `pool`. `source` goes back to the pool; the caller owns the result.
    ///
    /// On failure both buffers are handed back to the pool before the error
    /// is returned.
    pub fn pickle(
        &self,
        source: GrowableBuffer<u8>,
        pool: &BufferPool<u8>,
    ) -> Result<GrowableBuffer<u8>> {
        let mut target = pool.rent();
        let result = self.pickle_into(source.written(), &mut target);
        pool.return_buffer(source);
        match result {
            Ok(()) => Ok(target),
            Err(e) => {
                pool.return_buffer(target);
                Err(e)
            }
        }
    }

    /// Decompresses a pickle frame into a scratch buffer rented from `pool`.
    ///
    /// The caller owns the returned buffer and is responsible for returning
    /// it once the bytes are decoded. Malformed frames fail with
    /// `CorruptData`, in which case the scratch buffer is already returned.
    pub fn unpickle(&self, frame: &[u8], pool: &BufferPool<u8>) -> Result<GrowableBuffer<u8>> {
        let mut target = pool.rent();
        match self.unpickle_into(frame, &mut target) {
            Ok(()) => Ok(target),
            Err(e) => {
                pool.return_buffer(target);
                Err(e)
            }
        }
    }

    /// Appends the pickle frame of `bytes` to `target`.
    ///
    /// When compression does not make the payload smaller the bytes are
    /// stored as-is. An empty input produces a header-only frame.
    pub fn pickle_into(&self, bytes: &[u8], target: &mut GrowableBuffer<u8>) -> Result<()> {
        let uncompressed_len = u32::try_from(bytes.len()).map_err(|_| {
            Error::invalid_arg(
                "bytes",
                format!("pickled payload is limited to {} bytes", u32::MAX),
            )
        })?;
        if bytes.is_empty() {
            return FrameHeader::new(Method::Stored, 0).write(target);
        }

        let start = target.written_count();
        let result = self.compress_frame(bytes, uncompressed_len, start, target);
        if result.is_err() && !target.is_poisoned() {
            target.truncate(start);
        }
        result
    }

    fn compress_frame(
        &self,
        bytes: &[u8],
        uncompressed_len: u32,
        start: usize,
        target: &mut GrowableBuffer<u8>,
    ) -> Result<()> {
        with_compressor(self.compression, |compressor| {
            let room = target.options().max_capacity.saturating_sub(start);
            let bound = HEADER_LEN.saturating_add(compressor.compress_bound(bytes.len())?);
            if bound > room {
                log::debug!(
                    "compressed bound {bound} exceeds the {room} bytes left, storing {} bytes",
                    bytes.len()
                );
                return write_stored(bytes, uncompressed_len, target);
            }
            // The whole frame fits, so the compressor never grows the target
            // past its limit.
            target.reserve(bound)?;

            FrameHeader::new(compressor.method(), uncompressed_len).write(target)?;
            compressor.compress(bytes, target)?;

            let compressed_len = target.written_count() - start - HEADER_LEN;
            log::trace!(
                "pickled {} bytes into {compressed_len} ({:?})",
                bytes.len(),
                compressor.method()
            );
            if compressed_len >= bytes.len() {
                target.truncate(start);
                write_stored(bytes, uncompressed_len, target)?;
            }
            Ok(())
        })
    }

    /// Appends the original bytes of a pickle frame to `target`.
    pub fn unpickle_into(&self, frame: &[u8], target: &mut GrowableBuffer<u8>) -> Result<()> {
        let (header, payload) = FrameHeader::parse(frame)?;
        let uncompressed_len = header.uncompressed_len as usize;
        let start = target.written_count();

        let result = match header.method {
            Method::Stored => {
                if payload.len() != uncompressed_len {
                    return Err(Error::corrupt_data(
                        "pickle payload",
                        format!(
                            "stored payload holds {} bytes, header declares {uncompressed_len}",
                            payload.len()
                        ),
                    ));
                }
                copy_into(payload, target)
            }
            Method::Lz4 => Lz4Compressor::default().decompress(payload, uncompressed_len, target),
            Method::Zstd => {
                ZstdCompressor::default().decompress(payload, uncompressed_len, target)
            }
        };

        if result.is_err() && !target.is_poisoned() {
            target.truncate(start);
        }
        log::trace!(
            "unpickled {} bytes into {uncompressed_len} ({:?})",
            frame.len(),
            header.method
        );
        result
    }
}

fn with_compressor<R>(
    compression: Compression,
    f: impl FnOnce(&dyn Compressor) -> R,
) -> R {
    match compression {
        Compression::Lz4(parameters) => f(&Lz4Compressor::new(parameters)),
        Compression::Zstd(parameters) => f(&ZstdCompressor::new(parameters)),
    }
}

fn write_stored(bytes: &[u8], uncompressed_len: u32, target: &mut GrowableBuffer<u8>) -> Result<()> {
    FrameHeader::new(Method::Stored, uncompressed_len).write(target)?;
    copy_into(bytes, target)
}

fn copy_into(bytes: &[u8], target: &mut GrowableBuffer<u8>) -> Result<()> {
    let tail = target.writable_tail(bytes.len())?;
    tail[..bytes.len()].copy_from_slice(bytes);
    target.advance(bytes.len())
}

/// Pickles `source` with the default (LZ4 fast) pickler.
pub fn compress(source: GrowableBuffer<u8>, pool: &BufferPool<u8>) -> Result<GrowableBuffer<u8>> {
    Pickler::default().pickle(source, pool)
}

/// Unpickles a frame produced by any pickler.
pub fn decompress(frame: &[u8], pool: &BufferPool<u8>) -> Result<GrowableBuffer<u8>> {
    Pickler::default().unpickle(frame, pool)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use picklebench_buffers::{BufferOptions, PoolConfig};
    use picklebench_testkit::{compressible_bytes, random_bytes};

    use super::*;

    fn picklers() -> [Pickler; 3] {
        [
            Pickler::new(Compression::lz4()),
            Pickler::new(Compression::lz4_high_compression()),
            Pickler::new(Compression::zstd()),
        ]
    }

    fn filled(pool: &BufferPool<u8>, bytes: &[u8]) -> GrowableBuffer<u8> {
        let mut buffer = pool.rent();
        buffer.write_all(bytes).unwrap();
        buffer
    }

    #[test]
    fn test_pickle_round_trip() {
        let pool = BufferPool::new();
        for pickler in picklers() {
            for len in [1usize, 2, 17, 255, 256, 1000, 65_536, 300_000] {
                let data = compressible_bytes(len, len as u64);
                let pickled = pickler.pickle(filled(&pool, &data), &pool).unwrap();
                let restored = pickler.unpickle(pickled.written(), &pool).unwrap();
                assert_eq!(restored.written(), data.as_slice());
                pool.return_buffer(pickled);
                pool.return_buffer(restored);
            }
        }
    }

    #[test]
    fn test_random_bytes_round_trip() {
        let pool = BufferPool::new();
        let mut rng = fastrand::Rng::with_seed(42);
        for pickler in picklers() {
            for _ in 0..20 {
                let data = random_bytes(rng.usize(0..5000), rng.u64(..));
                let pickled = pickler.pickle(filled(&pool, &data), &pool).unwrap();
                // Incompressible input must not grow by more than the header.
                assert!(pickled.written_count() <= data.len() + HEADER_LEN);
                let restored = decompress(pickled.written(), &pool).unwrap();
                assert_eq!(restored.written(), data.as_slice());
                pool.return_buffer(pickled);
                pool.return_buffer(restored);
            }
        }
    }

    #[test]
    fn test_empty_round_trip() {
        let pool = BufferPool::new();
        for pickler in picklers() {
            let pickled = pickler.pickle(pool.rent(), &pool).unwrap();
            assert_eq!(pickled.written(), &[0x01, 0, 0, 0, 0]);
            let restored = pickler.unpickle(pickled.written(), &pool).unwrap();
            assert_eq!(restored.written_count(), 0);
            pool.return_buffer(pickled);
            pool.return_buffer(restored);
        }
    }

    #[test]
    fn test_compressible_data_shrinks() {
        let pool = BufferPool::new();
        let data = compressible_bytes(64 * 1024, 1);
        for pickler in picklers() {
            let pickled = pickler.pickle(filled(&pool, &data), &pool).unwrap();
            assert!(pickled.written_count() < data.len() / 2);
            let (header, _) = FrameHeader::parse(pickled.written()).unwrap();
            assert_eq!(header.method, pickler.compression().method());
            assert_eq!(header.uncompressed_len as usize, data.len());
            pool.return_buffer(pickled);
        }
    }

    #[test]
    fn test_cross_method_unpickle() {
        let pool = BufferPool::new();
        let data = compressible_bytes(10_000, 1);
        let zstd = Pickler::new(Compression::zstd());
        let pickled = zstd.pickle(filled(&pool, &data), &pool).unwrap();
        let restored = Pickler::default().unpickle(pickled.written(), &pool).unwrap();
        assert_eq!(restored.written(), data.as_slice());
    }

    #[test]
    fn test_source_goes_back_to_pool() {
        let pool = BufferPool::new();
        let data = compressible_bytes(4096, 1);
        let source = filled(&pool, &data);
        let pickled = compress(source, &pool).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.constructed, 2);
        assert_eq!(stats.idle, 1);

        let restored = decompress(pickled.written(), &pool).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.constructed, 2);
        assert_eq!(stats.idle, 0);
        assert_eq!(restored.written(), data.as_slice());

        pool.return_buffer(pickled);
        pool.return_buffer(restored);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn test_corrupt_frames() {
        let pool = BufferPool::new();
        let data = compressible_bytes(8192, 1);
        for pickler in picklers() {
            let pickled = pickler.pickle(filled(&pool, &data), &pool).unwrap();
            let frame = pickled.written().to_vec();
            pool.return_buffer(pickled);

            // Truncated payload.
            let err = pickler.unpickle(&frame[..frame.len() / 2], &pool).unwrap_err();
            assert!(err.is_corrupt_data(), "{err}");

            // Declared length disagrees with the payload.
            let mut wrong_len = frame.clone();
            wrong_len[1] = wrong_len[1].wrapping_add(1);
            let err = pickler.unpickle(&wrong_len, &pool).unwrap_err();
            assert!(err.is_corrupt_data(), "{err}");

            // Header only.
            let err = pickler.unpickle(&frame[..3], &pool).unwrap_err();
            assert!(err.is_corrupt_data(), "{err}");
        }

        let stored = [0x01, 4, 0, 0, 0, b'a', b'b'];
        assert!(decompress(&stored, &pool).unwrap_err().is_corrupt_data());

        // Every scratch buffer was handed back and is still usable.
        let stats = pool.stats();
        assert_eq!(stats.idle, stats.constructed);
        let mut scratch = pool.rent();
        assert_eq!(scratch.written_count(), 0);
        scratch.write_all(b"ok").unwrap();
    }

    #[test]
    fn test_unpickle_into_keeps_prefix_on_error() {
        let mut target = GrowableBuffer::new();
        target.write_all(b"keep").unwrap();
        let pickler = Pickler::default();
        assert!(pickler.unpickle_into(&[0x11, 9, 0, 0, 0, 1, 2], &mut target).is_err());
        assert_eq!(target.written(), b"keep");

        pickler.pickle_into(b"appended", &mut target).unwrap();
        let (header, payload) = FrameHeader::parse(&target.written()[4..]).unwrap();
        assert_eq!(header.method, Method::Stored);
        assert_eq!(payload, b"appended");
    }

    #[test]
    fn test_stored_when_compressed_bound_exceeds_limit() {
        let options = BufferOptions::default().with_max_capacity(1024);
        let pool = BufferPool::with_config(PoolConfig::default().with_buffer_options(options));
        let data = random_bytes(1010, 9);

        // Header + LZ4 bound (5 + 1029) does not fit, the stored frame (1015) does.
        for pickler in picklers() {
            let pickled = pickler.pickle(filled(&pool, &data), &pool).unwrap();
            assert_eq!(pickled.written_count(), data.len() + HEADER_LEN);
            let (header, payload) = FrameHeader::parse(pickled.written()).unwrap();
            assert_eq!(header.method, Method::Stored);
            assert_eq!(payload, data.as_slice());

            let restored = pickler.unpickle(pickled.written(), &pool).unwrap();
            assert_eq!(restored.written(), data.as_slice());
            pool.return_buffer(pickled);
            pool.return_buffer(restored);
        }
        assert_eq!(pool.stats().discarded, 0);
    }

    #[test]
    fn test_capacity_exceeded_discards_target() {
        let options = BufferOptions::default().with_max_capacity(1024);
        let pool = BufferPool::with_config(PoolConfig::default().with_buffer_options(options));
        let data = random_bytes(1020, 9);

        // Even the stored frame (5 + 1020) is over the limit.
        let err = Pickler::default().pickle(filled(&pool, &data), &pool).unwrap_err();
        assert!(err.is_capacity_exceeded(), "{err}");
        let stats = pool.stats();
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn test_zstd_frame_with_oversized_declared_length() {
        let pool = BufferPool::new();
        let pickler = Pickler::new(Compression::zstd());
        let data = compressible_bytes(4096, 5);
        let pickled = pickler.pickle(filled(&pool, &data), &pool).unwrap();
        let mut frame = pickled.written().to_vec();
        pool.return_buffer(pickled);
        frame[1..HEADER_LEN].copy_from_slice(&u32::MAX.to_le_bytes());

        let err = pickler.unpickle(&frame, &pool).unwrap_err();
        assert!(err.is_corrupt_data(), "{err}");
        let stats = pool.stats();
        assert_eq!(stats.discarded, 0);
        assert_eq!(stats.idle, stats.constructed);
    }
}
