use std::io::Read;

use picklebench_buffers::{BufferPool, GrowableBuffer};
use picklebench_common::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    bincode_codec::{BincodeCodec, encode_error},
    codec::{Codec, fill_rented},
};

/// `bincode` with built-in compression: the encoder writes through a zstd
/// stream into the pooled buffer, and decoding reads through the matching
/// decoder. This is the codec-level alternative to pickling, so its plain
/// form is already compressed.
#[derive(Debug, Clone, Copy)]
pub struct BincodeZstdCodec {
    level: i32,
}

impl BincodeZstdCodec {
    pub fn new(level: i32) -> BincodeZstdCodec {
        BincodeZstdCodec { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for BincodeZstdCodec {
    fn default() -> Self {
        BincodeZstdCodec::new(zstd::DEFAULT_COMPRESSION_LEVEL)
    }
}

impl<T> Codec<T> for BincodeZstdCodec
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        "bincode-zstd"
    }

    fn serialize_plain(&self, value: &T, pool: &BufferPool<u8>) -> Result<GrowableBuffer<u8>> {
        fill_rented(pool, |buffer| {
            let mut encoder = zstd::stream::write::Encoder::new(&mut *buffer, self.level)
                .map_err(|e| Error::io("Failed to create ZSTD encoder", e))?;
            bincode::serde::encode_into_std_write(value, &mut encoder, BincodeCodec::config())
                .map_err(encode_error)?;
            encoder.finish()?;
            Ok(())
        })
    }

    fn deserialize_plain(&self, bytes: &[u8]) -> Result<T> {
        let mut decoder = zstd::stream::read::Decoder::new(bytes)
            .map_err(|e| Error::deserialize("bincode-zstd", e))?;
        let value = bincode::serde::decode_from_std_read(&mut decoder, BincodeCodec::config())
            .map_err(|e| Error::deserialize("bincode-zstd", e))?;

        let mut trailing = [0u8; 1];
        let extra = decoder
            .read(&mut trailing)
            .map_err(|e| Error::deserialize("bincode-zstd", e))?;
        if extra != 0 {
            return Err(Error::deserialize(
                "bincode-zstd",
                "trailing bytes after the value",
            ));
        }
        Ok(value)
    }
}
