use std::{
    mem::ManuallyDrop,
    ops::{Deref, DerefMut},
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{growable::GrowableBuffer, options::PoolConfig};

/// Pool of growable buffers that are reused across serializer calls to avoid
/// per-call allocation.
///
/// # Thread Safety
///
/// The pool is thread-safe and can be shared across multiple threads: the
/// idle collection is protected by a mutex and the counters are atomic.
/// A rented buffer itself is not synchronized; it belongs exclusively to the
/// renter until it is handed back.
///
/// # Ownership
///
/// [`rent`](Self::rent) moves a buffer out of the pool and
/// [`return_buffer`](Self::return_buffer) moves it back, resetting it on the
/// way in. A buffer must go back to the pool it was rented from; mixing
/// pools is not detected. [`rent_scoped`](Self::rent_scoped) wraps the pair
/// into a lease that returns the buffer on drop.
///
/// # Bounds
///
/// By default the idle collection is unbounded. `PoolConfig::max_idle`
/// caps it and `PoolConfig::max_retained_capacity` drops buffers that
/// grew too large instead of keeping them around.
pub struct BufferPool<T> {
    buffers: Mutex<Vec<GrowableBuffer<T>>>,
    config: PoolConfig,
    counters: PoolCounters,
}

/// Snapshot of pool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Buffers constructed because the idle collection was empty.
    pub constructed: usize,
    /// Total `rent` calls.
    pub rented: usize,
    /// Buffers accepted back into the idle collection.
    pub returned: usize,
    /// Buffers handed back but dropped (poisoned, oversized or over the idle bound).
    pub discarded: usize,
    /// Current size of the idle collection.
    pub idle: usize,
}

impl PoolStats {
    /// Number of rents served by a recycled buffer.
    pub fn reused(&self) -> usize {
        // The counters are loaded separately and may be momentarily out of step.
        self.rented.saturating_sub(self.constructed)
    }
}

#[derive(Default)]
struct PoolCounters {
    constructed: AtomicUsize,
    rented: AtomicUsize,
    returned: AtomicUsize,
    discarded: AtomicUsize,
}

impl<T: Default> BufferPool<T> {
    /// Creates a new empty, unbounded pool.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Creates a new empty pool with the given configuration.
    pub fn with_config(config: PoolConfig) -> Self {
        BufferPool {
            buffers: Mutex::new(Vec::new()),
            config,
            counters: PoolCounters::default(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Takes an idle buffer, or constructs a fresh empty one if none is idle.
    ///
    /// No ordering is guaranteed on which idle buffer is handed out.
    pub fn rent(&self) -> GrowableBuffer<T> {
        self.counters.rented.fetch_add(1, Ordering::Relaxed);
        let recycled = self.lock_buffers().pop();
        match recycled {
            Some(buffer) => {
                log::trace!("rented pooled buffer, capacity {}", buffer.capacity());
                buffer
            }
            None => {
                self.counters.constructed.fetch_add(1, Ordering::Relaxed);
                log::debug!("pool empty, constructing a new buffer");
                GrowableBuffer::with_options(self.config.buffer.clone())
            }
        }
    }

    /// Rents a buffer wrapped in a lease that returns it to the pool on drop.
    pub fn rent_scoped(&self) -> PooledBuffer<'_, T> {
        PooledBuffer {
            pool: self,
            buffer: self.rent(),
        }
    }

    /// Resets `buffer` and moves it back into the idle collection.
    ///
    /// Poisoned buffers (see `CapacityExceeded`) are never taken back; they
    /// are dropped, as are buffers that violate the configured bounds.
    pub fn return_buffer(&self, mut buffer: GrowableBuffer<T>) {
        if buffer.is_poisoned() {
            log::warn!("discarding a buffer that exceeded its capacity limit");
            self.discard(buffer);
            return;
        }
        if let Some(limit) = self.config.max_retained_capacity {
            if buffer.capacity() > limit {
                log::debug!(
                    "discarding oversized buffer: capacity {}, limit {limit}",
                    buffer.capacity()
                );
                self.discard(buffer);
                return;
            }
        }

        buffer.reset();
        let mut buffers = self.lock_buffers();
        if let Some(max_idle) = self.config.max_idle {
            if buffers.len() >= max_idle {
                drop(buffers);
                log::debug!("idle limit {max_idle} reached, discarding returned buffer");
                self.discard(buffer);
                return;
            }
        }
        buffers.push(buffer);
        self.counters.returned.fetch_add(1, Ordering::Relaxed);
    }

    /// Current size of the idle collection.
    pub fn idle_count(&self) -> usize {
        self.lock_buffers().len()
    }

    /// Drops all idle buffers, releasing their memory.
    ///
    /// Returns the number of buffers released.
    pub fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.lock_buffers());
        drained.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            constructed: self.counters.constructed.load(Ordering::Relaxed),
            rented: self.counters.rented.load(Ordering::Relaxed),
            returned: self.counters.returned.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            idle: self.idle_count(),
        }
    }

    fn discard(&self, buffer: GrowableBuffer<T>) {
        self.counters.discarded.fetch_add(1, Ordering::Relaxed);
        drop(buffer);
    }

    fn lock_buffers(&self) -> MutexGuard<'_, Vec<GrowableBuffer<T>>> {
        // The idle list holds no invariant a panicking holder could break.
        self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Default> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer leased from a [`BufferPool`], returned to it when dropped.
///
/// Derefs to the underlying [`GrowableBuffer`]. The lifetime ties the lease
/// to its pool, so it cannot be returned anywhere else.
pub struct PooledBuffer<'a, T: Default> {
    pool: &'a BufferPool<T>,
    buffer: GrowableBuffer<T>,
}

impl<T: Default> PooledBuffer<'_, T> {
    /// Detaches the buffer from the lease; the caller becomes responsible for
    /// returning it.
    pub fn into_inner(self) -> GrowableBuffer<T> {
        let mut lease = ManuallyDrop::new(self);
        std::mem::take(&mut lease.buffer)
    }
}

impl<T: Default> Deref for PooledBuffer<'_, T> {
    type Target = GrowableBuffer<T>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl<T: Default> DerefMut for PooledBuffer<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl<T: Default> Drop for PooledBuffer<'_, T> {
    fn drop(&mut self) {
        self.pool.return_buffer(std::mem::take(&mut self.buffer));
    }
}
