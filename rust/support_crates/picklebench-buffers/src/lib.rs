//! Buffer management shared by every codec path:
//! - `GrowableBuffer<T>`: an owned, resizable store with a written prefix and a
//!   writable-tail protocol for in-place writes.
//! - `BufferPool<T>`: a thread-safe pool that recycles buffers between calls.

pub mod growable;
pub mod options;
pub mod pool;

pub use growable::GrowableBuffer;
pub use options::{BufferOptions, PoolConfig, ResetPolicy};
pub use pool::{BufferPool, PoolStats, PooledBuffer};
