use picklebench_buffers::{BufferPool, GrowableBuffer};
use picklebench_common::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};

use crate::codec::{Codec, fill_rented};

/// `bincode` with the standard (varint) configuration, through its serde API.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl BincodeCodec {
    pub(crate) fn config() -> impl bincode::config::Config {
        bincode::config::standard()
    }
}

/// Sink failures keep their own kind; everything else is a bincode error.
pub(crate) fn encode_error(e: bincode::error::EncodeError) -> Error {
    match e {
        bincode::error::EncodeError::Io { inner, .. } => Error::from(inner),
        other => Error::serialize("bincode", other),
    }
}

impl<T> Codec<T> for BincodeCodec
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn serialize_plain(&self, value: &T, pool: &BufferPool<u8>) -> Result<GrowableBuffer<u8>> {
        fill_rented(pool, |buffer| {
            bincode::serde::encode_into_std_write(value, buffer, Self::config())
                .map_err(encode_error)?;
            Ok(())
        })
    }

    fn deserialize_plain(&self, bytes: &[u8]) -> Result<T> {
        let (value, read) = bincode::serde::decode_from_slice(bytes, Self::config())
            .map_err(|e| Error::deserialize("bincode", e))?;
        if read != bytes.len() {
            return Err(Error::deserialize(
                "bincode",
                format!("{} trailing bytes after the value", bytes.len() - read),
            ));
        }
        Ok(value)
    }
}
