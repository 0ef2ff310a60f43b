use picklebench_buffers::{BufferPool, GrowableBuffer};
use picklebench_common::Result;
use picklebench_pickle::Pickler;

/// Serializes and deserializes `T` with one serialization library.
///
/// Implementations rent their output buffer from the pool passed in and hand
/// ownership of it to the caller; they never keep a buffer after returning.
/// The pickled variants compose the plain ones with a [`Pickler`].
pub trait Codec<T>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Serializes `value` into a buffer rented from `pool`.
    fn serialize_plain(&self, value: &T, pool: &BufferPool<u8>) -> Result<GrowableBuffer<u8>>;

    /// Decodes a value from the plain serialized form.
    fn deserialize_plain(&self, bytes: &[u8]) -> Result<T>;

    /// Serializes `value`, then compresses the result into a pickle frame.
    /// The intermediate buffer goes back to the pool.
    fn serialize_pickled(
        &self,
        value: &T,
        pool: &BufferPool<u8>,
        pickler: &Pickler,
    ) -> Result<GrowableBuffer<u8>> {
        let plain = self.serialize_plain(value, pool)?;
        pickler.pickle(plain, pool)
    }

    /// Unpickles `frame` into a scratch buffer, decodes from it and returns
    /// the scratch buffer to the pool.
    fn deserialize_pickled(&self, frame: &[u8], pool: &BufferPool<u8>, pickler: &Pickler) -> Result<T> {
        let scratch = pickler.unpickle(frame, pool)?;
        let result = self.deserialize_plain(scratch.written());
        pool.return_buffer(scratch);
        result
    }
}

/// Rents a buffer and lets `write` fill it. On failure the buffer goes back
/// to the pool before the error is returned.
pub(crate) fn fill_rented(
    pool: &BufferPool<u8>,
    write: impl FnOnce(&mut GrowableBuffer<u8>) -> Result<()>,
) -> Result<GrowableBuffer<u8>> {
    let mut buffer = pool.rent();
    match write(&mut buffer) {
        Ok(()) => Ok(buffer),
        Err(e) => {
            pool.return_buffer(buffer);
            Err(e)
        }
    }
}
