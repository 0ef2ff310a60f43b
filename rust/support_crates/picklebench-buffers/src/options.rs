//! Configuration of growable buffers and buffer pools.

use serde::{Deserialize, Serialize};

/// Capacity allocated on the first growth of an empty buffer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Default ceiling on the number of elements a buffer may hold.
pub const MAX_CAPACITY: usize = 0x7FEF_FFFF;

/// What [`reset`](crate::GrowableBuffer::reset) does with the slots that held
/// discarded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Only rewind the written count; old values stay in the store but are
    /// never observable through the buffer's views.
    Retain,
    /// Overwrite discarded slots with `T::default()`, releasing anything the
    /// old values owned.
    Clear,
}

impl ResetPolicy {
    /// `Clear` for element types with drop glue (owned heap data), `Retain`
    /// for plain values.
    pub const fn for_type<T>() -> ResetPolicy {
        if std::mem::needs_drop::<T>() {
            ResetPolicy::Clear
        } else {
            ResetPolicy::Retain
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferOptions {
    /// Capacity of the first allocation of an empty buffer.
    pub default_capacity: usize,
    /// Hard ceiling on the store length, in elements. Growth past it fails
    /// with `CapacityExceeded`.
    pub max_capacity: usize,
    /// `None` selects the policy from the element type when the buffer is
    /// constructed.
    pub reset_policy: Option<ResetPolicy>,
}

impl BufferOptions {
    /// Effective reset policy for buffers of `T`.
    pub fn reset_policy_for<T>(&self) -> ResetPolicy {
        self.reset_policy.unwrap_or(ResetPolicy::for_type::<T>())
    }

    pub fn with_default_capacity(mut self, default_capacity: usize) -> Self {
        self.default_capacity = default_capacity;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_reset_policy(mut self, reset_policy: ResetPolicy) -> Self {
        self.reset_policy = Some(reset_policy);
        self
    }
}

impl Default for BufferOptions {
    fn default() -> Self {
        BufferOptions {
            default_capacity: DEFAULT_CAPACITY,
            max_capacity: MAX_CAPACITY,
            reset_policy: None,
        }
    }
}

/// Pool behavior. The idle collection is unbounded unless `max_idle` is set;
/// returns that would push it past the bound drop the buffer instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Upper bound on the idle collection; `None` leaves it unbounded.
    #[serde(default)]
    pub max_idle: Option<usize>,
    /// Buffers whose capacity grew beyond this are dropped on return.
    #[serde(default)]
    pub max_retained_capacity: Option<usize>,
    /// Options for the buffers the pool constructs.
    #[serde(default)]
    pub buffer: BufferOptions,
}

impl PoolConfig {
    /// A configuration with no idle or retained-capacity bound and default
    /// buffer options. This is also the `Default`.
    pub fn unbounded() -> PoolConfig {
        PoolConfig {
            max_idle: None,
            max_retained_capacity: None,
            buffer: BufferOptions::default(),
        }
    }

    /// Bounds the idle collection.
    ///
    /// # Arguments
    ///
    /// * `max_idle` - Number of idle buffers the pool keeps. A buffer returned
    ///   while this many are idle is dropped and counted as discarded. Zero
    ///   disables recycling altogether.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    /// Drops returned buffers that grew too large.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Largest store length, in elements, that a returned
    ///   buffer may have and still be recycled.
    pub fn with_max_retained_capacity(mut self, capacity: usize) -> Self {
        self.max_retained_capacity = Some(capacity);
        self
    }

    /// Sets the options applied to every buffer the pool constructs.
    pub fn with_buffer_options(mut self, buffer: BufferOptions) -> Self {
        self.buffer = buffer;
        self
    }

    /// Parses a JSON-encoded configuration.
    ///
    /// Missing fields take their defaults, so `{}` is the unbounded
    /// configuration.
    ///
    /// # Returns
    ///
    /// The configuration, or `InvalidArgument` describing the JSON error.
    pub fn from_json(json: &str) -> picklebench_common::Result<PoolConfig> {
        serde_json::from_str(json)
            .map_err(|e| picklebench_common::Error::invalid_arg("pool config", e.to_string()))
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::unbounded()
    }
}
