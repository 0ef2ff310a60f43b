use picklebench_buffers::{BufferPool, GrowableBuffer};
use picklebench_common::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};

use crate::codec::{Codec, fill_rented};

/// UTF-8 JSON via `serde_json`, written straight into the pooled buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize_plain(&self, value: &T, pool: &BufferPool<u8>) -> Result<GrowableBuffer<u8>> {
        fill_rented(pool, |buffer| {
            serde_json::to_writer(buffer, value).map_err(|e| {
                if e.is_io() {
                    Error::from(std::io::Error::from(e))
                } else {
                    Error::serialize("json", e)
                }
            })
        })
    }

    fn deserialize_plain(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::deserialize("json", e))
    }
}
