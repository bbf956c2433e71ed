//! Contract and invariant assertion macros for the byte buffers.
//!
//! Two kinds of checks live here:
//!
//! - **Contract checks** (`assert_*`) guard caller preconditions. A violation is
//!   a programming error that would otherwise corrupt `head`/`tail`, so these
//!   panic in every build profile.
//! - **Invariant checks** (`debug_assert_*`) guard the buffer's own index
//!   arithmetic. They are only active with `debug_assertions`.
//!
//! Used by both `ByteBuf` and `SharedByteBuf`.

// =============================================================================
// CONTRACT: non-empty transfers
// =============================================================================

/// Assert that a transfer moves at least one byte.
///
/// Used in: `read()`, `skip()`, `write()`
macro_rules! assert_nonzero_len {
    ($op:literal, $len:expr) => {
        assert!($len > 0, "{}: length must be non-zero", $op)
    };
}

// =============================================================================
// CONTRACT: reads stay within unread data
// =============================================================================

/// Assert that `len` unread bytes are available.
///
/// **Contract**: `0 < len ≤ read_remaining`
///
/// Used in: `read()`, `skip()`
macro_rules! assert_readable {
    ($op:literal, $len:expr, $readable:expr) => {
        assert!(
            $len <= $readable,
            "{}: requested {} bytes but only {} are readable",
            $op,
            $len,
            $readable
        )
    };
}

// =============================================================================
// CONTRACT: staged writes stay below the overflow threshold
// =============================================================================

/// Assert that a staged write is strictly smaller than the usable capacity.
///
/// **Contract**: `len < alloc_size - 1`. Staging has no overflow collapse, so a
/// write that large must go through `write()` instead.
///
/// Used in: `prepare_write()`
macro_rules! assert_prepare_fits {
    ($len:expr, $alloc_size:expr) => {
        assert!(
            $len < $alloc_size - 1,
            "prepare_write: {} bytes must be less than the usable capacity {}",
            $len,
            $alloc_size - 1
        )
    };
}

// =============================================================================
// CONTRACT: commits never overrun unread data
// =============================================================================

/// Assert that publishing `len` bytes fits in the free space.
///
/// **Contract**: `len ≤ write_remaining`
///
/// Used in: `commit_write()`, `Writer::prepare_write()`
macro_rules! assert_writable {
    ($op:literal, $len:expr, $writable:expr) => {
        assert!(
            $len <= $writable,
            "{}: {} bytes exceed the {} writable bytes",
            $op,
            $len,
            $writable
        )
    };
}

// =============================================================================
// INVARIANT: indices stay inside the backing block
// =============================================================================

/// Assert `0 ≤ index < alloc_size` after an index update.
macro_rules! debug_assert_index_in_bounds {
    ($name:literal, $index:expr, $alloc_size:expr) => {
        debug_assert!(
            $index < $alloc_size,
            "{} index {} out of bounds for backing size {}",
            $name,
            $index,
            $alloc_size
        )
    };
}

// =============================================================================
// INVARIANT: every written byte is accounted for
// =============================================================================

/// Assert that a write changed the unread count by exactly what it added
/// minus what it overwrote.
///
/// **Invariant**: `new_readable == old_readable + written - overwritten`. A
/// mismatch means `head` and `tail` disagree about where the data ends, e.g.
/// a full buffer collapsed to `head == tail`.
///
/// Used in: `write()`, `commit_write()`
macro_rules! debug_assert_accounted {
    ($new_readable:expr, $old_readable:expr, $written:expr, $overwritten:expr) => {
        debug_assert!(
            $new_readable + $overwritten == $old_readable + $written,
            "byte accounting violated: {} readable after writing {} ({} overwritten) onto {}",
            $new_readable,
            $written,
            $overwritten,
            $old_readable
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use assert_nonzero_len;
pub(crate) use assert_prepare_fits;
pub(crate) use assert_readable;
pub(crate) use assert_writable;
pub(crate) use debug_assert_accounted;
pub(crate) use debug_assert_index_in_bounds;
