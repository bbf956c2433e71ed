use std::sync::atomic::{AtomicU64, Ordering};

/// Byte counters for a buffer, updated only when
/// [`Config::enable_metrics`](crate::Config::enable_metrics) is set.
///
/// The counters balance: `bytes_written - bytes_read - bytes_skipped -
/// bytes_overwritten` is the number of bytes currently readable. Updates
/// happen under the buffer's lock but [`snapshot`](Self::snapshot) reads
/// each counter on its own, so a snapshot taken while a [`Writer`] or
/// [`Reader`] is busy is only approximate.
///
/// [`Writer`]: crate::Writer
/// [`Reader`]: crate::Reader
#[derive(Debug, Default)]
pub struct Metrics {
    bytes_written: AtomicU64,
    bytes_read: AtomicU64,
    bytes_skipped: AtomicU64,
    bytes_overwritten: AtomicU64,
    commits: AtomicU64,
}

impl Metrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_bytes_written(&self, n: usize) {
        self.bytes_written.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_bytes_read(&self, n: usize) {
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_bytes_skipped(&self, n: usize) {
        self.bytes_skipped.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_bytes_overwritten(&self, n: usize) {
        if n > 0 {
            self.bytes_overwritten
                .fetch_add(n as u64, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_commit(&self, n: usize) {
        self.bytes_written.fetch_add(n as u64, Ordering::Relaxed);
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_skipped: self.bytes_skipped.load(Ordering::Relaxed),
            bytes_overwritten: self.bytes_overwritten.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`Metrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Bytes accepted by `write` or published by `commit_write`.
    pub bytes_written: u64,
    /// Bytes copied out by `read`.
    pub bytes_read: u64,
    /// Bytes discarded by `skip`.
    pub bytes_skipped: u64,
    /// Unread bytes lost to overwrite-oldest or to an overflowing write.
    pub bytes_overwritten: u64,
    /// Number of `commit_write` calls.
    pub commits: u64,
}

impl MetricsSnapshot {
    /// Bytes that were written and are neither read, skipped nor overwritten.
    ///
    /// Exact for a snapshot of an idle buffer. A snapshot taken mid-operation
    /// can count a consumed byte before the write that produced it, so the
    /// result saturates at 0.
    pub fn outstanding(&self) -> u64 {
        self.bytes_written
            .saturating_sub(self.bytes_read)
            .saturating_sub(self.bytes_skipped)
            .saturating_sub(self.bytes_overwritten)
    }
}
