//! Byte ring buffer split into one [`Writer`] and one [`Reader`] handle.
//!
//! The two handles may live on different threads. Operations that look at both
//! indices (`read`, `skip`, `write`, `commit_write`) run under a short mutex;
//! [`Writer::prepare_write`] runs without it and never reads `tail`, so the
//! payload copy of a staged write overlaps freely with the reader.
//!
//! # Example
//!
//! ```
//! use bytebuf_rs::{Config, SharedByteBuf};
//! use std::thread;
//!
//! let (mut writer, mut reader) = SharedByteBuf::split(Config::with_capacity(63)).unwrap();
//!
//! let producer = thread::spawn(move || {
//!     writer.prepare_write(b"frame");
//!     writer.commit_write(5);
//! });
//! producer.join().unwrap();
//!
//! let mut out = [0u8; 5];
//! reader.read(&mut out);
//! assert_eq!(&out, b"frame");
//! ```

use crate::invariants::{
    assert_nonzero_len, assert_prepare_fits, assert_readable, assert_writable,
    debug_assert_accounted, debug_assert_index_in_bounds,
};
use crate::storage::{self, advance, read_limit, split};
use crate::{Backoff, ByteBufError, Config, Metrics, MetricsSnapshot};
use crossbeam_utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

// =============================================================================
// SYNCHRONIZATION PROTOCOL
// =============================================================================
//
// ## Index ownership
//
// - `head` is stored only by the writer (`write`, `commit_write`), always
//   under `lock`. The writer may load it without the lock.
// - `tail` is stored by the reader (`read`, `skip`) and by the writer when
//   `write` overwrites the oldest bytes, always under `lock`.
//
// ## Staged writes
//
// `prepare_write` copies into `[head, head + len)` without the lock. That
// range is disjoint from the unread range `[tail, head)` as long as
// `len <= write_remaining`. The writer cannot read `tail` there, so it keeps
// `writable_hint`: the free space observed the last time it held the lock.
// Only the writer shrinks free space and it refreshes the hint whenever it
// does; the reader only grows it. The hint is therefore a lower bound, and
// checking against it keeps the unlocked copy off unread bytes.
//
// ## Visibility
//
// Bytes staged outside the lock become visible through `commit_write`: the
// `head` store happens under the lock, and the reader's next lock acquisition
// synchronizes with its release. In the other direction, bytes the reader
// copied out under the lock are released before the writer's next lock
// acquisition refreshes `writable_hint`, so the writer never stages over a
// slot the reader is still copying.
//
// =============================================================================

struct Inner {
    /// Next write position (stored by the writer under `lock`)
    head: CachePadded<AtomicUsize>,
    /// Next read position (stored under `lock`)
    tail: CachePadded<AtomicUsize>,
    /// Serializes every operation that depends on both indices
    lock: Mutex<()>,
    writer_alive: AtomicBool,
    reader_alive: AtomicBool,
    config: Config,
    metrics: Metrics,
    /// Backing block; disjoint ranges are accessed through raw pointers.
    block: Box<[UnsafeCell<u8>]>,
}

// SAFETY: `block` is only accessed through raw pointers to ranges that the
// protocol above keeps disjoint between the two handles; every other field is
// already `Sync`.
unsafe impl Sync for Inner {}

impl Inner {
    #[inline]
    fn alloc_size(&self) -> usize {
        self.block.len()
    }

    /// Base pointer covering the whole block.
    #[inline]
    fn base(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.block.as_ptr())
    }

    /// Unlocked snapshot of `(head, tail)`.
    #[inline]
    fn indices(&self) -> (usize, usize) {
        (
            self.head.load(Ordering::Acquire),
            self.tail.load(Ordering::Acquire),
        )
    }

    /// `(head, tail)` while `lock` is held.
    #[inline]
    fn indices_locked(&self, _guard: &MutexGuard<'_, ()>) -> (usize, usize) {
        (
            self.head.load(Ordering::Relaxed),
            self.tail.load(Ordering::Relaxed),
        )
    }

    #[inline]
    fn write_remaining_locked(&self, guard: &MutexGuard<'_, ()>) -> usize {
        let (head, tail) = self.indices_locked(guard);
        storage::write_remaining(head, tail, self.alloc_size())
    }

    /// Copies `src` into the block starting at `at`, wrapping past the end.
    ///
    /// # Safety
    ///
    /// `src.len()` must be below `alloc_size`, `at` must be in bounds, and no
    /// other access to the `src.len()` slots starting at `at` may happen
    /// concurrently.
    unsafe fn copy_in(&self, at: usize, src: &[u8]) {
        let (right, left) = split(at, src.len(), self.alloc_size());
        let base = self.base();
        ptr::copy_nonoverlapping(src.as_ptr(), base.add(at), right);
        ptr::copy_nonoverlapping(src.as_ptr().add(right), base, left);
    }

    /// Copies `dst.len()` bytes out of the block starting at `at`.
    ///
    /// # Safety
    ///
    /// The range must lie within the unread bytes and no concurrent write to
    /// it may happen.
    unsafe fn copy_out(&self, at: usize, limit: usize, dst: &mut [u8]) {
        let (right, left) = split(at, dst.len(), limit);
        let base = self.base();
        ptr::copy_nonoverlapping(base.add(at), dst.as_mut_ptr(), right);
        ptr::copy_nonoverlapping(base, dst.as_mut_ptr().add(right), left);
    }

    /// Copies (when `dst` is given) and consumes `len` unread bytes.
    ///
    /// `len` must already be checked against the unread count under `guard`.
    fn consume_locked(&self, guard: &MutexGuard<'_, ()>, len: usize, dst: Option<&mut [u8]>) {
        let alloc_size = self.alloc_size();
        let (head, tail) = self.indices_locked(guard);

        let copied = dst.is_some();
        if let Some(dst) = dst {
            // SAFETY: `[tail, tail + len)` is unread. The writer only writes
            // unread bytes under the lock we hold, and stages outside it only
            // into free space.
            unsafe { self.copy_out(tail, read_limit(head, tail, alloc_size), dst) };
        }

        let new_tail = advance(tail, len, alloc_size);
        debug_assert_index_in_bounds!("tail", new_tail, alloc_size);
        self.tail.store(new_tail, Ordering::Release);

        if self.config.enable_metrics {
            if copied {
                self.metrics.add_bytes_read(len);
            } else {
                self.metrics.add_bytes_skipped(len);
            }
        }
    }

    fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

/// Constructor for a byte ring buffer shared between two threads.
pub struct SharedByteBuf;

impl SharedByteBuf {
    /// Allocates a buffer and returns its writer and reader handles.
    ///
    /// The storage is freed when both handles have been dropped.
    ///
    /// # Panics
    ///
    /// Panics if `config.alloc_size` is 0.
    pub fn split(config: Config) -> Result<(Writer, Reader), ByteBufError> {
        let block = storage::allocate::<UnsafeCell<u8>>(config.alloc_size)?;

        let inner = Arc::new(Inner {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            lock: Mutex::new(()),
            writer_alive: AtomicBool::new(true),
            reader_alive: AtomicBool::new(true),
            config,
            metrics: Metrics::new(),
            block,
        });

        let writer = Writer {
            inner: Arc::clone(&inner),
            writable_hint: config.alloc_size - 1,
        };
        let reader = Reader { inner };
        Ok((writer, reader))
    }
}

// =============================================================================
// WRITER
// =============================================================================

/// The writing half of a [`SharedByteBuf`].
pub struct Writer {
    inner: Arc<Inner>,
    /// Lower bound on free space, refreshed whenever the lock is held.
    writable_hint: usize,
}

impl Writer {
    /// Returns the size of the backing block.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        self.inner.alloc_size()
    }

    /// Returns the usable capacity (`alloc_size - 1`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.alloc_size() - 1
    }

    /// Best-effort count of unread bytes, taken without the lock.
    #[inline]
    pub fn read_remaining(&self) -> usize {
        let (head, tail) = self.inner.indices();
        storage::read_remaining(head, tail, self.alloc_size())
    }

    /// Best-effort count of free bytes, taken without the lock.
    #[inline]
    pub fn write_remaining(&self) -> usize {
        let (head, tail) = self.inner.indices();
        storage::write_remaining(head, tail, self.alloc_size())
    }

    /// Free space known to this writer without taking the lock.
    ///
    /// This is the bound [`prepare_write`](Self::prepare_write) checks against.
    #[inline]
    pub fn writable_hint(&self) -> usize {
        self.writable_hint
    }

    /// Takes the lock, re-reads both indices and returns the free space.
    pub fn refresh_writable(&mut self) -> usize {
        let guard = self.inner.lock.lock();
        self.writable_hint = self.inner.write_remaining_locked(&guard);
        self.writable_hint
    }

    /// Appends `src`, overwriting the oldest unread bytes if it does not fit.
    ///
    /// Same semantics as [`ByteBuf::write`](crate::ByteBuf::write), including
    /// the collapse to the last `capacity` bytes of an oversized `src`.
    ///
    /// # Panics
    ///
    /// Panics if `src` is empty.
    pub fn write(&mut self, src: &[u8]) {
        let len = src.len();
        assert_nonzero_len!("write", len);

        let inner = &*self.inner;
        let alloc_size = inner.alloc_size();
        let max_len = alloc_size - 1;

        let guard = inner.lock.lock();
        let (head, tail) = inner.indices_locked(&guard);
        let readable = storage::read_remaining(head, tail, alloc_size);

        let overwritten = if len >= max_len {
            // Keep only the right-most bytes.
            // SAFETY: the lock is held, so the reader is not copying, and the
            // only unlocked access (`prepare_write`) belongs to this handle.
            unsafe { inner.copy_in(0, &src[len - max_len..]) };
            inner.tail.store(0, Ordering::Release);
            inner.head.store(max_len, Ordering::Release);

            let overwritten = readable + len - max_len;
            trace!(len, overwritten, "oversized write, keeping newest bytes");
            overwritten
        } else {
            // SAFETY: as above; `len < alloc_size - 1`.
            unsafe { inner.copy_in(head, src) };

            let overwritten = len.saturating_sub(max_len - readable);
            if overwritten > 0 {
                inner
                    .tail
                    .store(advance(tail, overwritten, alloc_size), Ordering::Release);
                trace!(len, overwritten, "write overwrote oldest unread bytes");
            }
            let new_head = advance(head, len, alloc_size);
            debug_assert_index_in_bounds!("head", new_head, alloc_size);
            inner.head.store(new_head, Ordering::Release);
            overwritten
        };

        let writable = inner.write_remaining_locked(&guard);
        debug_assert_accounted!(max_len - writable, readable, len, overwritten);
        if inner.config.enable_metrics {
            inner.metrics.add_bytes_overwritten(overwritten);
            inner.metrics.add_bytes_written(len);
        }
        drop(guard);
        self.writable_hint = writable;
    }

    /// Copies `src` into the free region after `head` without taking the lock.
    ///
    /// Reads only `head` and this handle's [`writable_hint`](Self::writable_hint);
    /// it never reads `tail`, so it can run while the reader is mid-copy. The
    /// bytes become readable after [`commit_write`](Self::commit_write).
    /// Staging again before committing replaces the earlier staged bytes.
    ///
    /// # Panics
    ///
    /// Panics if `src.len() >= capacity()`, or if `src.len()` exceeds the
    /// writable hint. Call [`refresh_writable`](Self::refresh_writable) or
    /// [`wait_writable`](Self::wait_writable) first when the reader may have
    /// freed space since this handle last held the lock.
    pub fn prepare_write(&mut self, src: &[u8]) {
        let len = src.len();
        assert_prepare_fits!(len, self.alloc_size());
        assert_writable!("prepare_write", len, self.writable_hint);

        // Only this handle stores `head`.
        let head = self.inner.head.load(Ordering::Relaxed);

        // SAFETY: `len <= writable_hint <= write_remaining`, so the staged
        // range lies entirely in free space, which the reader never touches.
        unsafe { self.inner.copy_in(head, src) };
    }

    /// Publishes `len` bytes previously staged by [`prepare_write`](Self::prepare_write).
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the free space observed under the lock.
    pub fn commit_write(&mut self, len: usize) {
        let inner = &*self.inner;
        let alloc_size = inner.alloc_size();

        let guard = inner.lock.lock();
        let (head, tail) = inner.indices_locked(&guard);
        let readable = storage::read_remaining(head, tail, alloc_size);
        assert_writable!("commit_write", len, alloc_size - 1 - readable);

        let new_head = advance(head, len, alloc_size);
        debug_assert_index_in_bounds!("head", new_head, alloc_size);
        debug_assert_accounted!(
            storage::read_remaining(new_head, tail, alloc_size),
            readable,
            len,
            0
        );
        inner.head.store(new_head, Ordering::Release);
        let writable = inner.write_remaining_locked(&guard);
        if inner.config.enable_metrics {
            inner.metrics.add_commit(len);
        }
        drop(guard);
        self.writable_hint = writable;
    }

    /// Waits until at least `len` bytes are free.
    ///
    /// Returns `Ok(true)` once they are, `Ok(false)` if the backoff gave up
    /// first. On `Ok(true)` the writable hint is refreshed, so a following
    /// `prepare_write` of `len` bytes passes provided `len < capacity()`; a
    /// full-capacity payload has to go through [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// [`ByteBufError::Disconnected`] if the reader was dropped and the space
    /// is not already free.
    ///
    /// # Panics
    ///
    /// Panics if `len > capacity()`.
    pub fn wait_writable(&mut self, len: usize) -> Result<bool, ByteBufError> {
        assert!(
            len <= self.capacity(),
            "wait_writable: {} bytes can never fit in capacity {}",
            len,
            self.capacity()
        );

        let mut backoff = Backoff::from_config(&self.inner.config);
        loop {
            if self.writable_hint >= len || self.refresh_writable() >= len {
                return Ok(true);
            }
            if !self.inner.reader_alive.load(Ordering::Acquire) {
                return Err(ByteBufError::Disconnected);
            }
            if backoff.is_completed() {
                return Ok(false);
            }
            backoff.snooze();
        }
    }

    /// Returns true if the reader handle has been dropped.
    #[inline]
    pub fn is_reader_dropped(&self) -> bool {
        !self.inner.reader_alive.load(Ordering::Acquire)
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics()
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        self.inner.writer_alive.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("alloc_size", &self.alloc_size())
            .field("writable_hint", &self.writable_hint)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// READER
// =============================================================================

/// The reading half of a [`SharedByteBuf`].
pub struct Reader {
    inner: Arc<Inner>,
}

impl Reader {
    /// Returns the size of the backing block.
    #[inline]
    pub fn alloc_size(&self) -> usize {
        self.inner.alloc_size()
    }

    /// Returns the usable capacity (`alloc_size - 1`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.alloc_size() - 1
    }

    /// Best-effort count of unread bytes, taken without the lock.
    #[inline]
    pub fn read_remaining(&self) -> usize {
        let (head, tail) = self.inner.indices();
        storage::read_remaining(head, tail, self.alloc_size())
    }

    /// Best-effort count of free bytes, taken without the lock.
    #[inline]
    pub fn write_remaining(&self) -> usize {
        let (head, tail) = self.inner.indices();
        storage::write_remaining(head, tail, self.alloc_size())
    }

    /// Copies the oldest `dst.len()` unread bytes into `dst` and consumes them.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is empty or longer than the unread byte count observed
    /// under the lock.
    pub fn read(&mut self, dst: &mut [u8]) {
        let len = dst.len();
        assert_nonzero_len!("read", len);

        let guard = self.inner.lock.lock();
        let (head, tail) = self.inner.indices_locked(&guard);
        let readable = storage::read_remaining(head, tail, self.alloc_size());
        assert_readable!("read", len, readable);
        self.inner.consume_locked(&guard, len, Some(dst));
    }

    /// Copies up to `dst.len()` unread bytes into `dst`, returning how many.
    ///
    /// Returns 0 when the buffer is empty or `dst` is empty.
    pub fn try_read(&mut self, dst: &mut [u8]) -> usize {
        let guard = self.inner.lock.lock();
        let (head, tail) = self.inner.indices_locked(&guard);
        let readable = storage::read_remaining(head, tail, self.alloc_size());
        let len = dst.len().min(readable);
        if len > 0 {
            self.inner.consume_locked(&guard, len, Some(&mut dst[..len]));
        }
        len
    }

    /// Discards the oldest `len` unread bytes without copying them.
    ///
    /// # Panics
    ///
    /// Panics if `len` is 0 or exceeds the unread byte count.
    pub fn skip(&mut self, len: usize) {
        assert_nonzero_len!("skip", len);

        let guard = self.inner.lock.lock();
        let (head, tail) = self.inner.indices_locked(&guard);
        let readable = storage::read_remaining(head, tail, self.alloc_size());
        assert_readable!("skip", len, readable);
        self.inner.consume_locked(&guard, len, None);
    }

    /// Waits until at least `len` bytes are unread.
    ///
    /// Returns `Ok(true)` once they are, `Ok(false)` if the backoff gave up
    /// first.
    ///
    /// # Errors
    ///
    /// [`ByteBufError::Disconnected`] if the writer was dropped and fewer than
    /// `len` bytes remain.
    ///
    /// # Panics
    ///
    /// Panics if `len > capacity()`.
    pub fn wait_readable(&mut self, len: usize) -> Result<bool, ByteBufError> {
        assert!(
            len <= self.capacity(),
            "wait_readable: {} bytes can never be buffered in capacity {}",
            len,
            self.capacity()
        );

        let mut backoff = Backoff::from_config(&self.inner.config);
        loop {
            if self.read_remaining() >= len {
                return Ok(true);
            }
            if !self.inner.writer_alive.load(Ordering::Acquire) {
                // The writer may have published right before dropping.
                return if self.read_remaining() >= len {
                    Ok(true)
                } else {
                    Err(ByteBufError::Disconnected)
                };
            }
            if backoff.is_completed() {
                return Ok(false);
            }
            backoff.snooze();
        }
    }

    /// Returns true if the writer handle has been dropped.
    #[inline]
    pub fn is_writer_dropped(&self) -> bool {
        !self.inner.writer_alive.load(Ordering::Acquire)
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics()
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.inner.reader_alive.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("alloc_size", &self.alloc_size())
            .finish_non_exhaustive()
    }
}
