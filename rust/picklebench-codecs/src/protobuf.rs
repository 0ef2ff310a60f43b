use picklebench_buffers::{BufferPool, GrowableBuffer};
use picklebench_common::{Error, Result};

use crate::codec::{Codec, fill_rented};

/// Protocol Buffers via `prost`.
///
/// The encoded length is known up front, so the message is encoded directly
/// into a writable tail of exactly that size.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtobufCodec;

impl<T> Codec<T> for ProtobufCodec
where
    T: prost::Message + Default,
{
    fn name(&self) -> &'static str {
        "protobuf"
    }

    fn serialize_plain(&self, value: &T, pool: &BufferPool<u8>) -> Result<GrowableBuffer<u8>> {
        fill_rented(pool, |buffer| {
            let len = value.encoded_len();
            let tail = buffer.writable_tail(len)?;
            let mut dst: &mut [u8] = &mut tail[..len];
            value
                .encode(&mut dst)
                .map_err(|e| Error::serialize("protobuf", e))?;
            buffer.advance(len)
        })
    }

    fn deserialize_plain(&self, bytes: &[u8]) -> Result<T> {
        T::decode(bytes).map_err(|e| Error::deserialize("protobuf", e))
    }
}
