//! bytebuf-rs - Fixed-Capacity Byte Ring Buffer
//!
//! A circular byte buffer that decouples a producer from a consumer. One byte
//! of the backing block is always kept free so that `head == tail` means
//! empty, which lets the buffer run on two indices alone.
//!
//! # Key Features
//!
//! - Overwrite-oldest writes: `write()` never fails for lack of space
//! - Oversized writes keep only the newest `capacity` bytes
//! - Two-phase `prepare_write()` / `commit_write()` so the payload copy runs
//!   outside the lock and never reads the reader's index
//! - [`SharedByteBuf`] splits a buffer into a [`Writer`] and a [`Reader`] that
//!   can live on different threads
//!
//! # Example
//!
//! ```
//! use bytebuf_rs::{ByteBuf, Config};
//!
//! let mut buf = ByteBuf::new(Config::with_capacity(15)).unwrap();
//!
//! buf.write(b"hello ");
//!
//! // Stage, then publish
//! buf.prepare_write(b"world");
//! buf.commit_write(5);
//!
//! let mut out = vec![0u8; buf.read_remaining()];
//! buf.read(&mut out);
//! assert_eq!(out, b"hello world");
//! ```
//!
//! Contract violations (zero-length transfers, reading past the unread bytes,
//! committing past the free space) panic. The only recoverable error is
//! [`ByteBufError::AllocationFailure`].

mod backoff;
mod bytebuf;
mod config;
mod error;
mod invariants;
mod metrics;
mod shared;
mod storage;

pub use backoff::Backoff;
pub use bytebuf::ByteBuf;
pub use config::{Config, SMALL_CONFIG, STREAM_CONFIG};
pub use error::ByteBufError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use shared::{Reader, SharedByteBuf, Writer};
