//! Error types for byte buffer operations.
//!
//! Only resource failures are reported through [`ByteBufError`]. Contract
//! violations (zero-length transfers, reading more than is readable, committing
//! more than is writable) are programming errors and panic immediately.

use thiserror::Error;

/// Errors that can occur when creating or waiting on a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ByteBufError {
    /// The backing storage could not be allocated.
    #[error("failed to allocate {size} bytes of buffer storage")]
    AllocationFailure {
        /// The requested backing size in bytes.
        size: usize,
    },

    /// The peer handle of a shared buffer was dropped while waiting on it.
    #[error("peer handle disconnected")]
    Disconnected,
}

impl ByteBufError {
    /// Returns `true` if retrying (e.g. with a smaller size) may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AllocationFailure { .. })
    }
}
