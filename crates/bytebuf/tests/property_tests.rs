//! Property-based tests for the byte ring buffer.
//!
//! Every test drives a `ByteBuf` (and, where noted, the split
//! `Writer`/`Reader` pair) alongside a `VecDeque<u8>` model that applies the
//! same overwrite-oldest rules, and checks that both agree on the unread
//! bytes after each step.
//!
//! Coverage:
//! - ByteBuf (owned)
//! - SharedByteBuf (single-threaded use of both handles)

use bytebuf_rs::{ByteBuf, Config, SharedByteBuf};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::VecDeque;

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Write(Vec<u8>),
    Read(usize),
    Skip(usize),
    Staged(Vec<u8>),
}

fn op_strategy(alloc_size: usize) -> impl Strategy<Value = Op> {
    // Writes up to twice the block size exercise the overflow regime too.
    prop_oneof![
        vec(any::<u8>(), 1..alloc_size * 2).prop_map(Op::Write),
        (1..alloc_size).prop_map(Op::Read),
        (1..alloc_size).prop_map(Op::Skip),
        vec(any::<u8>(), 1..alloc_size).prop_map(Op::Staged),
    ]
}

fn ops_strategy() -> impl Strategy<Value = (usize, Vec<Op>)> {
    (2usize..40).prop_flat_map(|alloc_size| {
        let ops = vec(op_strategy(alloc_size), 1..60);
        (Just(alloc_size), ops)
    })
}

/// Reference model: unread bytes, oldest first.
struct Model {
    bytes: VecDeque<u8>,
    capacity: usize,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self {
            bytes: VecDeque::new(),
            capacity,
        }
    }

    fn writable(&self) -> usize {
        self.capacity - self.bytes.len()
    }

    fn write(&mut self, data: &[u8]) {
        if data.len() >= self.capacity {
            self.bytes.clear();
            self.bytes.extend(&data[data.len() - self.capacity..]);
            return;
        }
        self.bytes.extend(data);
        while self.bytes.len() > self.capacity {
            self.bytes.pop_front();
        }
    }

    fn take(&mut self, len: usize) -> Vec<u8> {
        self.bytes.drain(..len).collect()
    }
}

fn drain(buf: &mut ByteBuf) -> Vec<u8> {
    let len = buf.read_remaining();
    let mut out = vec![0u8; len];
    if len > 0 {
        buf.read(&mut out);
    }
    out
}

// =============================================================================
// Capacity invariant + content agreement
// "read_remaining + write_remaining == alloc_size - 1"
// =============================================================================

proptest! {
    /// Any sequence of operations keeps the buffer equal to the model.
    #[test]
    fn prop_matches_model((alloc_size, ops) in ops_strategy()) {
        let capacity = alloc_size - 1;
        let mut buf = ByteBuf::new(Config::new(alloc_size, true)).unwrap();
        let mut model = Model::new(capacity);

        for op in ops {
            match op {
                Op::Write(data) => {
                    buf.write(&data);
                    model.write(&data);
                }
                Op::Read(n) => {
                    let n = n.min(model.bytes.len());
                    if n > 0 {
                        let mut out = vec![0u8; n];
                        buf.read(&mut out);
                        prop_assert_eq!(out, model.take(n));
                    }
                }
                Op::Skip(n) => {
                    let n = n.min(model.bytes.len());
                    if n > 0 {
                        buf.skip(n);
                        model.take(n);
                    }
                }
                Op::Staged(data) => {
                    if data.len() < capacity && data.len() <= model.writable() {
                        buf.prepare_write(&data);
                        buf.commit_write(data.len());
                        model.write(&data);
                    }
                }
            }

            prop_assert_eq!(buf.read_remaining(), model.bytes.len());
            prop_assert_eq!(buf.read_remaining() + buf.write_remaining(), capacity);
            prop_assert_eq!(buf.is_empty(), model.bytes.is_empty());
        }

        let metrics = buf.metrics();
        prop_assert_eq!(metrics.outstanding(), model.bytes.len() as u64);
        let expected: Vec<u8> = model.bytes.iter().copied().collect();
        prop_assert_eq!(drain(&mut buf), expected);
    }

    /// Same as above through the split handles, used from one thread.
    #[test]
    fn prop_shared_matches_model((alloc_size, ops) in ops_strategy()) {
        let capacity = alloc_size - 1;
        let config = Config::new(alloc_size, false);
        let (mut writer, mut reader) = SharedByteBuf::split(config).unwrap();
        let mut model = Model::new(capacity);

        for op in ops {
            match op {
                Op::Write(data) => {
                    writer.write(&data);
                    model.write(&data);
                }
                Op::Read(n) => {
                    let mut out = vec![0u8; n];
                    let got = reader.try_read(&mut out);
                    let expected = model.take(n.min(model.bytes.len()));
                    prop_assert_eq!(&out[..got], &expected[..]);
                }
                Op::Skip(n) => {
                    let n = n.min(model.bytes.len());
                    if n > 0 {
                        reader.skip(n);
                        model.take(n);
                    }
                }
                Op::Staged(data) => {
                    if data.len() < capacity && data.len() <= writer.refresh_writable() {
                        writer.prepare_write(&data);
                        writer.commit_write(data.len());
                        model.write(&data);
                    }
                }
            }

            prop_assert_eq!(reader.read_remaining(), model.bytes.len());
            prop_assert_eq!(writer.write_remaining(), model.writable());
        }
    }
}

// =============================================================================
// Round-trip and wraparound
// =============================================================================

proptest! {
    /// Writing S (|S| < capacity) into an empty buffer and reading |S| bytes yields S.
    #[test]
    fn prop_round_trip(data in vec(any::<u8>(), 1..63)) {
        let mut buf = ByteBuf::new(Config::with_capacity(63)).unwrap();
        buf.write(&data);
        prop_assert_eq!(drain(&mut buf), data);
    }

    /// Write, read about half, write again across the physical end, read
    /// everything back in order.
    #[test]
    fn prop_wraparound(
        alloc_size in 4usize..64,
        start in 0usize..64,
        first_frac in 0.0f64..1.0,
    ) {
        let capacity = alloc_size - 1;
        let mut buf = ByteBuf::new(Config::new(alloc_size, false)).unwrap();

        // Park both indices at `start` so the crossing point varies.
        let start = start % alloc_size;
        if start > 0 {
            buf.write(&vec![0xEE; start]);
            buf.skip(start);
        }

        let first_len = 2 + ((capacity - 2) as f64 * first_frac) as usize;
        let first: Vec<u8> = (0..first_len).map(|i| i as u8).collect();
        buf.write(&first);

        let half = first_len / 2;
        let mut head = vec![0u8; half];
        buf.read(&mut head);
        prop_assert_eq!(&head[..], &first[..half]);

        // Fill all the free space: the unread range now covers every slot but
        // one, so it spans the end of the block unless `tail` sits at 0.
        let free = buf.write_remaining();
        let second: Vec<u8> = (0..free).map(|i| 200u8.wrapping_add(i as u8)).collect();
        buf.write(&second);
        prop_assert!(buf.is_full());

        let mut expected = first[half..].to_vec();
        expected.extend_from_slice(&second);
        prop_assert_eq!(drain(&mut buf), expected);
    }
}

// =============================================================================
// Overflow-collapse and overwrite-oldest
// =============================================================================

proptest! {
    /// Writing M >= capacity bytes leaves exactly the last `capacity` bytes.
    #[test]
    fn prop_overflow_collapse(
        alloc_size in 2usize..48,
        prefix in vec(any::<u8>(), 0..48),
        extra in 0usize..48,
    ) {
        let capacity = alloc_size - 1;
        let mut buf = ByteBuf::new(Config::new(alloc_size, false)).unwrap();
        if !prefix.is_empty() {
            buf.write(&prefix);
        }

        let data: Vec<u8> = (0..capacity + extra).map(|i| (i * 7) as u8).collect();
        buf.write(&data);

        prop_assert_eq!(buf.read_remaining(), capacity);
        prop_assert_eq!(drain(&mut buf), data[data.len() - capacity..].to_vec());
    }

    /// A write larger than the free space drops exactly `len - writable` oldest bytes.
    #[test]
    fn prop_overwrite_oldest(
        alloc_size in 4usize..48,
        old_frac in 0.0f64..1.0,
        new_frac in 0.0f64..1.0,
        rotate in 0usize..48,
    ) {
        let capacity = alloc_size - 1;
        let mut buf = ByteBuf::new(Config::new(alloc_size, false)).unwrap();

        // Move the indices around so the overwrite can straddle the end.
        let rotate = rotate % capacity;
        if rotate > 0 {
            buf.write(&vec![0xEE; rotate]);
            buf.skip(rotate);
        }

        // At least 2 old bytes, so some write length lies strictly between
        // the free space and the capacity.
        let old_len = 2 + ((capacity - 2) as f64 * old_frac) as usize;
        let old: Vec<u8> = (0..old_len).map(|i| i as u8).collect();
        buf.write(&old);

        let writable = buf.write_remaining();
        // writable < new_len < capacity
        let span = capacity - 1 - writable;
        let new_len = writable + 1 + ((span - 1) as f64 * new_frac) as usize;
        let new: Vec<u8> = (0..new_len).map(|i| 100u8.wrapping_add(i as u8)).collect();
        buf.write(&new);

        let mut expected = old[new_len - writable..].to_vec();
        expected.extend_from_slice(&new);
        prop_assert_eq!(buf.read_remaining(), expected.len());
        prop_assert_eq!(drain(&mut buf), expected);
    }
}

// =============================================================================
// Prepare/commit equivalence
// =============================================================================

proptest! {
    /// prepare_write + commit_write is indistinguishable from write when it fits.
    #[test]
    fn prop_prepare_commit_equivalence(
        alloc_size in 3usize..48,
        prefix in vec(any::<u8>(), 0..48),
        consumed in 0usize..48,
        payload in vec(any::<u8>(), 1..48),
    ) {
        let config = Config::new(alloc_size, false);
        let mut direct = ByteBuf::new(config).unwrap();
        let mut staged = ByteBuf::new(config).unwrap();

        if !prefix.is_empty() {
            direct.write(&prefix);
            staged.write(&prefix);
        }
        let consumed = consumed.min(direct.read_remaining());
        if consumed > 0 {
            direct.skip(consumed);
            staged.skip(consumed);
        }

        if direct.write_remaining() < 2 {
            let all = direct.read_remaining();
            direct.skip(all);
            staged.skip(all);
        }

        let len = payload.len().min(direct.write_remaining() - 1);
        let payload = &payload[..len];

        direct.write(payload);
        staged.prepare_write(payload);
        staged.commit_write(len);

        prop_assert_eq!(direct.read_remaining(), staged.read_remaining());
        prop_assert_eq!(drain(&mut direct), drain(&mut staged));
    }
}
