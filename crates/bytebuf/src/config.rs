/// Configuration for [`ByteBuf`](crate::ByteBuf) and
/// [`SharedByteBuf`](crate::SharedByteBuf).
///
/// `alloc_size` is the size of the backing block. One byte of it is always kept
/// free, so the usable capacity is `alloc_size - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Total backing size in bytes (default: 64 KiB)
    pub alloc_size: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
    /// Spin steps (as a power of 2) before a waiting handle starts yielding
    pub spin_limit: u32,
    /// Yield steps before a waiting handle gives up
    pub yield_limit: u32,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(alloc_size: usize, enable_metrics: bool) -> Self {
        Self {
            alloc_size,
            enable_metrics,
            spin_limit: 6,
            yield_limit: 10,
        }
    }

    /// Creates a configuration able to hold exactly `capacity` unread bytes.
    pub const fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity + 1, false)
    }

    /// Sets the backoff limits used by `wait_readable`/`wait_writable`.
    pub const fn with_backoff(mut self, spin_limit: u32, yield_limit: u32) -> Self {
        self.spin_limit = spin_limit;
        self.yield_limit = yield_limit;
        self
    }

    /// Enables or disables metrics collection.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Returns the usable capacity (bytes that can be unread at once).
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.alloc_size.saturating_sub(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1 << 16, false)
    }
}

/// Small buffer for short control streams (4 KiB backing block)
pub const SMALL_CONFIG: Config = Config::new(1 << 12, false);

/// Large buffer for continuous media/byte streams (1 MiB, metrics on)
pub const STREAM_CONFIG: Config = Config::new(1 << 20, true);
