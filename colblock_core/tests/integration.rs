//! Integration tests: blocks compressed by the bundled strategies, decoded
//! through a shared codec cache and pooled buffers, the way column readers
//! use this crate.
//!
//!  1. Every compression kind × byte order round-trips, with the decoded
//!     buffer exposing its full capacity.
//!  2. 64 threads hammer the same pool; no buffer is ever live twice and the
//!     pool drains back to zero outstanding buffers.
//!  3. Corrupt and truncated blocks fail loudly and never leak buffers.
use std::sync::{Arc, Barrier};
use std::thread;

use colblock_codecs::{default_registry, strategy_for};
use colblock_core::{
    ByteOrder, CodecContext, CompressionKind, CompressionStrategy, Error, ExhaustionPolicy,
    ObjectStrategy, PoolConfig,
};
use dashmap::DashSet;

/// Generate `len` deterministic bytes using a simple LCG.
fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

/// A block of fixed-width column values in the given byte order.
fn int_column(values: usize, order: ByteOrder, seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(values * 4);
    for i in 0..values as u64 {
        let v = (i.wrapping_mul(seed) % 1000) as u32;
        out.extend_from_slice(&order.u32_to(v));
    }
    out
}

fn context(config: PoolConfig) -> CodecContext {
    CodecContext::new(config, default_registry()).unwrap()
}

// ── tests ──────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_every_kind_and_order() {
    let ctx = context(PoolConfig::default());
    let block_size = ctx.pool().block_size();

    for kind in CompressionKind::ALL {
        let strategy = strategy_for(kind);
        for order in ByteOrder::ALL {
            let raw = int_column(5000, order, 7);
            let compressed = strategy.compress(&raw).unwrap();

            let codec = ctx.codec(order, kind).unwrap();
            let block = codec.decode(&compressed, compressed.len()).unwrap();

            assert_eq!(block.order(), order);
            assert_eq!(block.payload(), &raw[..], "{} / {}", kind, order);
            assert_eq!(block.limit(), block_size, "{} / {}", kind, order);
            assert_eq!(block.as_slice().len(), block_size);
            assert_eq!(block.get_u32(4 * 4999).unwrap(), (4999u64 * 7 % 1000) as u32);
            block.release();
        }
    }
    assert_eq!(ctx.pool().outstanding(), 0);
    assert_eq!(ctx.cache().len(), CompressionKind::ALL.len() * ByteOrder::ALL.len());
}

#[test]
fn test_length_bounds_the_source() {
    // Column readers hand in a slice of the whole segment plus a length.
    let ctx = context(PoolConfig::default());
    let raw = pseudo_random_bytes(3000, 11);
    let compressed = strategy_for(CompressionKind::Lz4).compress(&raw).unwrap();
    let mut segment = compressed.clone();
    segment.extend_from_slice(&pseudo_random_bytes(500, 12));

    let codec = ctx.codec(ByteOrder::Little, CompressionKind::Lz4).unwrap();
    let block = codec.decode(&segment, compressed.len()).unwrap();
    assert_eq!(block.payload(), &raw[..]);
}

#[test]
fn test_truncated_payload_is_decode_failure() {
    let ctx = context(PoolConfig::default());

    // 1 byte of LZ4 body claiming 1000 bytes of original length.
    let mut lz4 = 1000u32.to_le_bytes().to_vec();
    lz4.push(0xF0);
    let codec = ctx.codec(ByteOrder::Big, CompressionKind::Lz4).unwrap();
    let err = codec.decode(&lz4, lz4.len()).unwrap_err();
    assert!(matches!(err, Error::Decode { kind: CompressionKind::Lz4, .. }), "{}", err);

    let zstd = strategy_for(CompressionKind::Zstd)
        .compress(&pseudo_random_bytes(1000, 3))
        .unwrap();
    let codec = ctx.codec(ByteOrder::Big, CompressionKind::Zstd).unwrap();
    let err = codec.decode(&zstd, 1).unwrap_err();
    assert!(matches!(err, Error::Decode { kind: CompressionKind::Zstd, .. }), "{}", err);

    // Claimed length longer than the bytes supplied.
    let err = codec.decode(&zstd, zstd.len() + 1).unwrap_err();
    assert!(err.is_data_corruption());

    assert_eq!(ctx.pool().outstanding(), 0);
}

#[test]
fn test_decoding_codec_is_read_only() {
    let ctx = context(PoolConfig::default());
    let codec = ctx.codec(ByteOrder::Little, CompressionKind::Lz4).unwrap();
    assert!(!codec.can_compare());
    assert!(!codec.can_encode());

    let raw = [1u8, 2, 3, 4];
    let compressed = strategy_for(CompressionKind::Lz4).compress(&raw).unwrap();
    let a = codec.decode(&compressed, compressed.len()).unwrap();
    let b = codec.decode(&compressed, compressed.len()).unwrap();
    assert!(matches!(codec.compare(&a, &b), Err(Error::Unsupported { .. })));
    assert!(matches!(codec.to_bytes(&a), Err(Error::Unsupported { .. })));
}

#[test]
fn test_concurrent_decodes_never_share_buffers() {
    const THREADS: usize = 64;
    const ITERATIONS: usize = 10_000;

    // Fewer buffers than threads, so acquisition blocks and buffers recycle.
    let ctx = Arc::new(context(
        PoolConfig::default()
            .with_block_size(1024)
            .with_max_buffers(16)
            .with_policy(ExhaustionPolicy::Block),
    ));
    let live = Arc::new(DashSet::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let ctx = Arc::clone(&ctx);
            let live = Arc::clone(&live);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let order = ByteOrder::ALL[t % 2];
                let kind = CompressionKind::ALL[t % 3];
                let raw = pseudo_random_bytes(256 + t, t as u64);
                let compressed = strategy_for(kind).compress(&raw).unwrap();
                let codec = ctx.codec(order, kind).unwrap();

                barrier.wait();
                for _ in 0..ITERATIONS {
                    let block = codec.decode(&compressed, compressed.len()).unwrap();
                    let key = (block.order(), block.id());
                    assert!(live.insert(key), "buffer {:?} handed out twice", key);
                    assert_eq!(block.order(), order);
                    assert_eq!(block.payload(), &raw[..]);
                    assert!(live.remove(&key).is_some());
                    block.release();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert!(live.is_empty());
    assert_eq!(ctx.pool().outstanding(), 0);
    for order in ByteOrder::ALL {
        let stats = ctx.pool().stats(order);
        assert!(stats.allocated <= 16);
        assert_eq!(stats.free, stats.allocated);
    }
}

#[test]
fn test_codec_instances_shared_across_threads() {
    let ctx = Arc::new(context(PoolConfig::default()));
    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ctx.cache()
                    .get_or_create_by_id(ByteOrder::Big, 0x02)
                    .unwrap()
            })
        })
        .collect();
    let codecs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(codecs.iter().all(|c| Arc::ptr_eq(c, &codecs[0])));
    assert_eq!(codecs[0].compression(), CompressionKind::Zstd);
}

#[test]
fn test_exhaustion_under_fail_policy() {
    let ctx = context(
        PoolConfig::default()
            .with_block_size(512)
            .with_max_buffers(2)
            .with_policy(ExhaustionPolicy::Fail),
    );
    let raw = pseudo_random_bytes(100, 5);
    let compressed = strategy_for(CompressionKind::Uncompressed).compress(&raw).unwrap();
    let codec = ctx.codec(ByteOrder::Little, CompressionKind::Uncompressed).unwrap();

    let a = codec.decode(&compressed, compressed.len()).unwrap();
    let b = codec.decode(&compressed, compressed.len()).unwrap();
    assert!(matches!(
        codec.decode(&compressed, compressed.len()),
        Err(Error::PoolExhausted { order: ByteOrder::Little, max: 2 })
    ));
    drop(a);
    let c = codec.decode(&compressed, compressed.len()).unwrap();
    assert_ne!(b.id(), c.id());
}
