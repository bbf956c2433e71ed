//! Producer/consumer demo over a shared byte ring buffer.
//!
//! A producer thread stages fixed-size "packets" outside the lock and
//! publishes them with `commit_write`; a slower consumer drains whatever is
//! available. A second phase lets the producer run ahead with plain `write`
//! calls so overwrite-oldest kicks in.
//!
//! Run with: `RUST_LOG=trace cargo run --example demo`

use bytebuf_rs::{Config, SharedByteBuf, STREAM_CONFIG};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PACKET: usize = 1500;
const PACKETS: usize = 20_000;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env();
    tracing_subscriber::fmt()
        .with_env_filter(filter.unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    lossless(STREAM_CONFIG)?;
    lossy(Config::new(16 * 1024, true))?;
    Ok(())
}

/// Producer waits for room; every byte reaches the consumer.
fn lossless(config: Config) -> anyhow::Result<()> {
    let (mut writer, mut reader) = SharedByteBuf::split(config)?;
    info!(capacity = writer.capacity(), "lossless phase");

    let start = Instant::now();
    let producer = thread::spawn(move || -> anyhow::Result<()> {
        let mut packet = [0u8; PACKET];
        for seq in 0..PACKETS {
            packet.fill(seq as u8);
            while !writer.wait_writable(PACKET)? {}
            writer.prepare_write(&packet);
            writer.commit_write(PACKET);
        }
        Ok(())
    });

    let mut received = 0usize;
    let mut chunk = vec![0u8; 4096];
    while received < PACKETS * PACKET {
        let n = reader.try_read(&mut chunk);
        received += n;
        if n == 0 {
            thread::yield_now();
        }
    }
    producer.join().expect("producer panicked")?;

    let elapsed = start.elapsed();
    let metrics = reader.metrics();
    info!(
        bytes = received,
        commits = metrics.commits,
        overwritten = metrics.bytes_overwritten,
        mib_per_sec = received as f64 / elapsed.as_secs_f64() / (1024.0 * 1024.0),
        "lossless phase done"
    );
    Ok(())
}

/// Producer never waits; a slow consumer only sees the freshest bytes.
fn lossy(config: Config) -> anyhow::Result<()> {
    let (mut writer, mut reader) = SharedByteBuf::split(config)?;
    info!(capacity = writer.capacity(), "lossy phase");

    let producer = thread::spawn(move || {
        let packet = [0xABu8; PACKET];
        for _ in 0..PACKETS / 10 {
            writer.write(&packet);
        }
    });

    let mut chunk = vec![0u8; 512];
    let mut received = 0usize;
    while !reader.is_writer_dropped() || reader.read_remaining() > 0 {
        received += reader.try_read(&mut chunk);
        thread::sleep(Duration::from_micros(50));
    }
    producer.join().expect("producer panicked");

    let metrics = reader.metrics();
    info!(
        received,
        written = metrics.bytes_written,
        overwritten = metrics.bytes_overwritten,
        "lossy phase done"
    );
    Ok(())
}
