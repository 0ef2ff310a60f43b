use picklebench_common::{Error, Result, verify_arg};

use crate::options::{BufferOptions, ResetPolicy};

/// An output sink into which `T` values are written through a "writable tail"
/// protocol: request room with [`writable_tail`](Self::writable_tail), fill
/// a prefix of the returned slice, then commit it with [`advance`](Self::advance).
///
/// The backing store is a `Vec<T>` whose length always equals the buffer
/// capacity; every slot is initialized, and only the first `written_count`
/// slots are considered valid data.
///
/// # Reuse
///
/// The buffer must be [`reset`](Self::reset) before it is reused. With
/// [`ResetPolicy::Retain`] (the default for types without drop glue) reset only
/// rewinds the written count; with [`ResetPolicy::Clear`] the discarded slots
/// are overwritten with `T::default()` so no stale owned values linger.
///
/// # Capacity ceiling
///
/// Growth beyond the configured maximum capacity fails with
/// `CapacityExceeded`. That condition is fatal: the buffer is poisoned and
/// rejects further writes.
pub struct GrowableBuffer<T> {
    store: Vec<T>,
    written: usize,
    options: BufferOptions,
    reset_policy: ResetPolicy,
    poisoned: bool,
}

impl<T: Default> GrowableBuffer<T> {
    /// Creates an empty buffer (capacity 0) with the default options for `T`.
    pub fn new() -> GrowableBuffer<T> {
        Self::with_options(BufferOptions::default())
    }

    /// Creates an empty buffer with the given options.
    pub fn with_options(options: BufferOptions) -> GrowableBuffer<T> {
        GrowableBuffer {
            store: Vec::new(),
            written: 0,
            reset_policy: options.reset_policy_for::<T>(),
            options,
            poisoned: false,
        }
    }

    /// Creates a buffer pre-sized to `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Result<GrowableBuffer<T>> {
        let mut buffer = Self::new();
        buffer.set_capacity(capacity)?;
        Ok(buffer)
    }

    /// Returns the data written to the buffer so far.
    #[inline]
    pub fn written(&self) -> &[T] {
        &self.store[..self.written]
    }

    /// Returns the data written to the buffer so far, mutably.
    #[inline]
    pub fn written_mut(&mut self) -> &mut [T] {
        &mut self.store[..self.written]
    }

    /// Number of valid elements at the front of the store.
    #[inline]
    pub fn written_count(&self) -> usize {
        self.written
    }

    /// Total length of the backing store.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Number of unwritten elements available without growing.
    #[inline]
    pub fn free_capacity(&self) -> usize {
        self.store.len() - self.written
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Whether the buffer hit `CapacityExceeded` and must be discarded.
    #[inline]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        self.reset_policy
    }

    /// Returns a mutable slice over at least `size_hint` unwritten elements
    /// (at least one element when `size_hint` is 0), growing the store when
    /// needed. The slice is never empty.
    ///
    /// Writing into the slice does not change the written count; call
    /// [`advance`](Self::advance) with the number of elements produced.
    pub fn writable_tail(&mut self, size_hint: usize) -> Result<&mut [T]> {
        self.check_usable("writable_tail")?;
        self.ensure_capacity(size_hint.max(1))?;
        Ok(&mut self.store[self.written..])
    }

    /// Commits `count` elements of the most recently returned tail.
    pub fn advance(&mut self, count: usize) -> Result<()> {
        self.check_usable("advance")?;
        verify_arg!(count, count <= self.store.len() - self.written);
        self.written += count;
        Ok(())
    }

    /// Resizes the backing store to exactly `capacity` elements.
    ///
    /// Shrinking below the written count discards the excess data and clamps
    /// the written count to the new capacity. A capacity above
    /// `max_capacity` is rejected with `InvalidArgument` and leaves the
    /// buffer untouched and usable.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        self.check_usable("set_capacity")?;
        verify_arg!(capacity, capacity <= self.options.max_capacity);
        self.resize_store(capacity);
        self.written = self.written.min(capacity);
        Ok(())
    }

    /// Grows the store so that at least `additional` more elements fit.
    ///
    /// Unlike [`writable_tail`](Self::writable_tail), a doubling step that
    /// would pass `max_capacity` is clamped to the limit instead of failing,
    /// so the request only fails when `written_count + additional` itself
    /// exceeds the limit. That failure is `CapacityExceeded` and poisons the
    /// buffer.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.check_usable("reserve")?;
        if additional <= self.free_capacity() {
            return Ok(());
        }
        let required = self.written.saturating_add(additional);
        if required > self.options.max_capacity {
            return Err(self.poison(required));
        }
        let doubled = self
            .store
            .len()
            .saturating_mul(2)
            .min(self.options.max_capacity);
        self.resize_store(required.max(doubled));
        Ok(())
    }

    /// Clears the written data, preparing the buffer for reuse.
    ///
    /// Capacity is retained. See [`ResetPolicy`] for what happens to the
    /// discarded slots.
    pub fn reset(&mut self) {
        self.truncate(0);
    }

    /// Shortens the written data to `len` elements; no-op when `len` is not
    /// below the written count. Discarded slots follow the reset policy.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.written {
            return;
        }
        if self.reset_policy == ResetPolicy::Clear {
            self.store[len..self.written]
                .iter_mut()
                .for_each(|slot| *slot = T::default());
        }
        self.written = len;
    }

    fn ensure_capacity(&mut self, size_hint: usize) -> Result<()> {
        if size_hint <= self.free_capacity() {
            return Ok(());
        }

        let capacity = self.store.len();
        let mut target = if capacity == 0 {
            self.options.default_capacity
        } else {
            capacity.saturating_mul(2)
        };
        if target - self.written < size_hint {
            target = self.written.saturating_add(size_hint);
        }

        if target > self.options.max_capacity {
            return Err(self.poison(target));
        }

        self.resize_store(target);
        Ok(())
    }

    fn poison(&mut self, requested: usize) -> Error {
        self.poisoned = true;
        log::debug!(
            "growable buffer poisoned: requested capacity {requested}, limit {}",
            self.options.max_capacity
        );
        Error::capacity_exceeded(requested, self.options.max_capacity)
    }

    fn resize_store(&mut self, capacity: usize) {
        if capacity >= self.store.len() {
            self.store.reserve_exact(capacity - self.store.len());
            self.store.resize_with(capacity, T::default);
        } else {
            self.store.truncate(capacity);
            self.store.shrink_to_fit();
        }
    }

    fn check_usable(&self, operation: &str) -> Result<()> {
        if self.poisoned {
            return Err(Error::invalid_operation(format!(
                "{operation} on a buffer that exceeded its capacity limit"
            )));
        }
        Ok(())
    }
}

impl<T: Default> Default for GrowableBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for GrowableBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowableBuffer")
            .field("written", &self.written)
            .field("capacity", &self.store.len())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

/// Byte buffers act as a `std::io::Write` sink, which is how serializers and
/// stream compressors feed them.
impl std::io::Write for GrowableBuffer<u8> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let tail = self.writable_tail(buf.len())?;
        tail[..buf.len()].copy_from_slice(buf);
        self.advance(buf.len())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
