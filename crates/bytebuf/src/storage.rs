//! Backing storage allocation and the modular index arithmetic shared by
//! [`ByteBuf`](crate::ByteBuf) and [`SharedByteBuf`](crate::SharedByteBuf).
//!
//! Both buffers keep `head` and `tail` as plain indices in `[0, alloc_size)`.
//! One slot is always left unused so that `head == tail` can only mean
//! "empty"; no separate length field is kept.

use crate::ByteBufError;
use tracing::error;

/// Allocates a zeroed backing block of exactly `alloc_size` elements.
///
/// Uses `try_reserve_exact` so an out-of-memory condition surfaces as
/// [`ByteBufError::AllocationFailure`] instead of aborting the process.
pub(crate) fn allocate<T: Default>(alloc_size: usize) -> Result<Box<[T]>, ByteBufError> {
    assert!(alloc_size > 0, "byte buffer alloc_size must be > 0");

    let mut block = Vec::new();
    if let Err(err) = block.try_reserve_exact(alloc_size) {
        error!(size = alloc_size, %err, "failed to allocate byte buffer storage");
        return Err(ByteBufError::AllocationFailure { size: alloc_size });
    }
    block.resize_with(alloc_size, T::default);
    Ok(block.into_boxed_slice())
}

/// Number of unread bytes between `tail` and `head`.
#[inline]
pub(crate) const fn read_remaining(head: usize, tail: usize, alloc_size: usize) -> usize {
    (alloc_size + head - tail) % alloc_size
}

/// Number of bytes that can be written before the buffer is full.
#[inline]
pub(crate) const fn write_remaining(head: usize, tail: usize, alloc_size: usize) -> usize {
    alloc_size - 1 - read_remaining(head, tail, alloc_size)
}

/// Advances `index` by `len` positions, wrapping at `alloc_size`.
#[inline]
pub(crate) const fn advance(index: usize, len: usize, alloc_size: usize) -> usize {
    (index + len) % alloc_size
}

/// Splits a `len`-byte range starting at `start` into the part that fits
/// before `limit` and the part that wraps around to offset 0.
///
/// Returns `(right_len, left_len)`.
#[inline]
pub(crate) fn split(start: usize, len: usize, limit: usize) -> (usize, usize) {
    let right = (limit - start).min(len);
    (right, len - right)
}

/// Copies `src` into `block` starting at `at`, wrapping past the end.
///
/// `src.len()` must be below `block.len()` so the wrapped part never reaches
/// back to `at`.
pub(crate) fn copy_in(block: &mut [u8], at: usize, src: &[u8]) {
    let (right, left) = split(at, src.len(), block.len());
    block[at..at + right].copy_from_slice(&src[..right]);
    block[..left].copy_from_slice(&src[right..]);
}

/// Copies `dst.len()` bytes out of `block` starting at `at`, wrapping past
/// `limit`.
///
/// `limit` is `head` when the unread bytes do not wrap and the end of the
/// block when they do; either way the first segment never runs past the
/// unread range.
pub(crate) fn copy_out(block: &[u8], at: usize, limit: usize, dst: &mut [u8]) {
    let (right, left) = split(at, dst.len(), limit);
    dst[..right].copy_from_slice(&block[at..at + right]);
    dst[right..].copy_from_slice(&block[..left]);
}

/// The `limit` argument for [`copy_out`] given the current indices.
#[inline]
pub(crate) const fn read_limit(head: usize, tail: usize, alloc_size: usize) -> usize {
    if tail < head {
        head
    } else {
        alloc_size
    }
}
