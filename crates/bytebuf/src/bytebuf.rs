use crate::invariants::{
    assert_nonzero_len, assert_prepare_fits, assert_readable, assert_writable,
    debug_assert_accounted, debug_assert_index_in_bounds,
};
use crate::storage::{self, advance, copy_in, copy_out, read_limit};
use crate::{ByteBufError, Config, Metrics, MetricsSnapshot};
use tracing::trace;

// =============================================================================
// INDEX PROTOCOL
// =============================================================================
//
// The buffer is a block of `alloc_size` bytes with two indices:
//
// - `head`: next byte to be written
// - `tail`: next byte to be read
//
// Unread bytes are `[tail, head)` modulo `alloc_size`. One slot is always left
// free, so the usable capacity is `alloc_size - 1` and `head == tail` means
// empty, never full.
//
// ## Writes
//
// `write()` never fails for lack of space. If the payload is at least the
// usable capacity, the block is replaced by its last `alloc_size - 1` bytes.
// Otherwise the payload is copied at `head` and, when it does not fit,
// `tail` is pushed forward past the oldest unread bytes before `head` moves.
//
// ## Staged writes
//
// `prepare_write()` copies at `head` without looking at `tail` or moving
// `head`; `commit_write()` publishes the bytes by moving `head`. On this
// owned buffer both take `&mut self`; `SharedByteBuf` runs the staging half
// outside its lock.
//
// =============================================================================

/// Fixed-capacity byte ring buffer.
///
/// Owns a single block of `alloc_size` bytes; `alloc_size - 1` of them can be
/// unread at once. Writes never block or fail: when the block is full the
/// oldest unread bytes are overwritten.
///
/// # Example
///
/// ```
/// use bytebuf_rs::{ByteBuf, Config};
///
/// let mut buf = ByteBuf::new(Config::with_capacity(7)).unwrap();
/// buf.write(b"ABCDE");
/// buf.write(b"FGH"); // only 2 bytes free: "A" is dropped
///
/// let mut out = [0u8; 7];
/// buf.read(&mut out);
/// assert_eq!(&out, b"BCDEFGH");
/// ```
pub struct ByteBuf {
    block: Box<[u8]>,
    head: usize,
    tail: usize,
    config: Config,
    metrics: Metrics,
}

impl ByteBuf {
    /// Allocates a buffer of `config.alloc_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `config.alloc_size` is 0.
    pub fn new(config: Config) -> Result<Self, ByteBufError> {
        let block = storage::allocate::<u8>(config.alloc_size)?;

        Ok(Self {
            block,
            head: 0,
            tail: 0,
            config,
            metrics: Metrics::new(),
        })
    }

    /// Allocates a buffer of `alloc_size` bytes with default settings.
    pub fn with_alloc_size(alloc_size: usize) -> Result<Self, ByteBufError> {
        Self::new(Config::new(alloc_size, false))
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Returns the size of the backing block.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        self.block.len()
    }

    /// Returns the usable capacity (`alloc_size - 1`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block.len() - 1
    }

    /// Returns the number of unread bytes.
    #[inline]
    pub fn read_remaining(&self) -> usize {
        storage::read_remaining(self.head, self.tail, self.block.len())
    }

    /// Returns the number of bytes that can be written without overwriting.
    #[inline]
    pub fn write_remaining(&self) -> usize {
        storage::write_remaining(self.head, self.tail, self.block.len())
    }

    /// Returns true if there are no unread bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Returns true if the next write will overwrite unread bytes.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.write_remaining() == 0
    }

    // ---------------------------------------------------------------------
    // READ API
    // ---------------------------------------------------------------------

    /// Copies the oldest `dst.len()` unread bytes into `dst` and consumes them.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is empty or longer than [`read_remaining`](Self::read_remaining).
    pub fn read(&mut self, dst: &mut [u8]) {
        let len = dst.len();
        assert_nonzero_len!("read", len);
        assert_readable!("read", len, self.read_remaining());

        let alloc_size = self.alloc_size();
        let limit = read_limit(self.head, self.tail, alloc_size);
        copy_out(&self.block, self.tail, limit, dst);

        self.tail = advance(self.tail, len, alloc_size);
        debug_assert_index_in_bounds!("tail", self.tail, alloc_size);

        if self.config.enable_metrics {
            self.metrics.add_bytes_read(len);
        }
    }

    /// Discards the oldest `len` unread bytes without copying them.
    ///
    /// # Panics
    ///
    /// Panics if `len` is 0 or greater than [`read_remaining`](Self::read_remaining).
    pub fn skip(&mut self, len: usize) {
        assert_nonzero_len!("skip", len);
        assert_readable!("skip", len, self.read_remaining());

        self.tail = advance(self.tail, len, self.alloc_size());
        debug_assert_index_in_bounds!("tail", self.tail, self.alloc_size());

        if self.config.enable_metrics {
            self.metrics.add_bytes_skipped(len);
        }
    }

    // ---------------------------------------------------------------------
    // WRITE API
    // ---------------------------------------------------------------------

    /// Appends `src`, overwriting the oldest unread bytes if it does not fit.
    ///
    /// If `src` is at least [`capacity`](Self::capacity) bytes long, the
    /// buffer ends up holding exactly the last `capacity` bytes of `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is empty.
    pub fn write(&mut self, src: &[u8]) {
        let len = src.len();
        assert_nonzero_len!("write", len);

        let alloc_size = self.alloc_size();
        let max_len = alloc_size - 1;
        let readable = self.read_remaining();

        if len >= max_len {
            // Keep only the right-most bytes
            self.block[..max_len].copy_from_slice(&src[len - max_len..]);
            self.tail = 0;
            self.head = max_len;

            let overwritten = readable + len - max_len;
            trace!(len, overwritten, "oversized write, keeping newest bytes");
            debug_assert_accounted!(self.read_remaining(), readable, len, overwritten);
            self.record_write(len, overwritten);
            return;
        }

        copy_in(&mut self.block, self.head, src);

        let overwritten = len.saturating_sub(max_len - readable);
        if overwritten > 0 {
            self.tail = advance(self.tail, overwritten, alloc_size);
            trace!(len, overwritten, "write overwrote oldest unread bytes");
        }
        self.head = advance(self.head, len, alloc_size);

        debug_assert_index_in_bounds!("head", self.head, alloc_size);
        debug_assert_accounted!(self.read_remaining(), readable, len, overwritten);
        self.record_write(len, overwritten);
    }

    /// Copies `src` into the free region after `head` without publishing it.
    ///
    /// The bytes become readable only after [`commit_write`](Self::commit_write).
    /// This never reads `tail` and never checks free space: the caller must
    /// already know that `src.len()` bytes are writable, otherwise the copy
    /// lands on unread data and `commit_write` will panic.
    ///
    /// # Panics
    ///
    /// Panics if `src.len() >= capacity()`.
    pub fn prepare_write(&mut self, src: &[u8]) {
        assert_prepare_fits!(src.len(), self.alloc_size());
        copy_in(&mut self.block, self.head, src);
    }

    /// Publishes `len` bytes previously staged by [`prepare_write`](Self::prepare_write).
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds [`write_remaining`](Self::write_remaining).
    pub fn commit_write(&mut self, len: usize) {
        let readable = self.read_remaining();
        assert_writable!("commit_write", len, self.capacity() - readable);

        self.head = advance(self.head, len, self.alloc_size());
        debug_assert_index_in_bounds!("head", self.head, self.alloc_size());
        debug_assert_accounted!(self.read_remaining(), readable, len, 0);

        if self.config.enable_metrics {
            self.metrics.add_commit(len);
        }
    }

    // ---------------------------------------------------------------------
    // METRICS
    // ---------------------------------------------------------------------

    #[inline]
    fn record_write(&self, len: usize, overwritten: usize) {
        if self.config.enable_metrics {
            self.metrics.add_bytes_written(len);
            self.metrics.add_bytes_overwritten(overwritten);
        }
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl std::fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBuf")
            .field("alloc_size", &self.alloc_size())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish_non_exhaustive()
    }
}
