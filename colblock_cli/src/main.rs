use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use xxhash_rust::xxh3::xxh3_64;

use colblock_codecs::{default_registry, strategy_for};
use colblock_core::{ByteOrder, CodecContext, CompressionKind, CompressionStrategy, PoolConfig};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "colblock",
    about = "Round-trip and stress-decode column blocks through the pooled block codec",
    version
)]
struct Cli {
    /// Pool configuration file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the configured block size in bytes
    #[arg(short, long, global = true)]
    block_size: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into blocks, compress them, decode through the pool and verify
    Roundtrip {
        /// Source file
        input: PathBuf,
        /// Compression: lz4 | zstd | uncompressed
        #[arg(short, long, default_value = "lz4")]
        compression: String,
        /// Byte order of the decoding codec: big | little | native
        #[arg(short, long, default_value = "native")]
        order: String,
    },
    /// Decode synthetic column blocks from many threads at once
    Bench {
        /// Compression: lz4 | zstd | uncompressed
        #[arg(short, long, default_value = "lz4")]
        compression: String,
        /// Byte order of the decoding codec: big | little | native
        #[arg(short, long, default_value = "native")]
        order: String,
        /// Decoding threads
        #[arg(short, long, default_value_t = 8)]
        threads: usize,
        /// Decodes per thread
        #[arg(short, long, default_value_t = 10_000)]
        iterations: usize,
        /// Distinct synthetic blocks to pick from
        #[arg(long, default_value_t = 64)]
        blocks: usize,
        /// Fixed random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, block_size: Option<usize>) -> anyhow::Result<PoolConfig> {
    let mut config = match path {
        Some(path) => PoolConfig::from_file(path)
            .with_context(|| format!("loading pool config {:?}", path))?,
        None => PoolConfig::default(),
    };
    if let Some(block_size) = block_size {
        config.block_size = block_size;
        config.validate()?;
    }
    Ok(config)
}

fn parse_compression(name: &str) -> anyhow::Result<CompressionKind> {
    CompressionKind::from_name(name).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown compression '{}'. Valid options: lz4, zstd, uncompressed",
            name
        )
    })
}

fn parse_order(name: &str) -> anyhow::Result<ByteOrder> {
    ByteOrder::from_name(name).ok_or_else(|| {
        anyhow::anyhow!("unknown byte order '{}'. Valid options: big, little, native", name)
    })
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

/// Synthetic fixed-width integer column block, mostly small deltas so it
/// compresses the way real numeric columns do.
fn synthetic_block(values: usize, order: ByteOrder, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    let mut acc = 0u32;
    let mut out = Vec::with_capacity(values * 4);
    for _ in 0..values {
        rng = rng
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        acc = acc.wrapping_add(((rng >> 60) as u32) & 0x7);
        out.extend_from_slice(&order.u32_to(acc));
    }
    out
}

fn print_pool_stats(ctx: &CodecContext) {
    for order in ByteOrder::ALL {
        let s = ctx.pool().stats(order);
        println!(
            "  pool {:<13}: allocated {:>5}  outstanding {:>5}  free {:>5}",
            order, s.allocated, s.outstanding, s.free
        );
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_roundtrip(
    config: PoolConfig,
    input: PathBuf,
    compression: &str,
    order: &str,
) -> anyhow::Result<()> {
    let kind = parse_compression(compression)?;
    let order = parse_order(order)?;
    let block_size = config.block_size;
    let ctx = CodecContext::new(config, default_registry())?;

    let data = std::fs::read(&input).with_context(|| format!("reading input file {:?}", input))?;
    let strategy = strategy_for(kind);

    let t0 = Instant::now();
    let blocks = data
        .chunks(block_size)
        .map(|raw| Ok((strategy.compress(raw)?, xxh3_64(raw))))
        .collect::<colblock_core::Result<Vec<_>>>()?;
    let compress_elapsed = t0.elapsed();
    let compressed_size: u64 = blocks.iter().map(|(c, _)| c.len() as u64).sum();

    let codec = ctx.codec(order, kind)?;
    let t1 = Instant::now();
    for (idx, (compressed, checksum)) in blocks.iter().enumerate() {
        let block = codec
            .decode(compressed, compressed.len())
            .with_context(|| format!("decoding block {}", idx))?;
        let computed = xxh3_64(block.payload());
        if computed != *checksum {
            anyhow::bail!(
                "block {} checksum mismatch: expected {:016x}, got {:016x}",
                idx,
                checksum,
                computed
            );
        }
        block.release();
    }
    let decode_elapsed = t1.elapsed();
    debug!(blocks = blocks.len(), "round trip verified");

    let raw_size = data.len() as u64;
    println!("  compression : {}", kind);
    println!("  byte order  : {}", order);
    println!("  block size  : {}", human_bytes(block_size as u64));
    println!("  blocks      : {}", blocks.len());
    println!("  raw size    : {}", human_bytes(raw_size));
    println!("  compressed  : {}", human_bytes(compressed_size));
    if compressed_size > 0 {
        println!("  ratio       : {:.2}x", raw_size as f64 / compressed_size as f64);
    }
    println!(
        "  compress    : {}/s",
        human_bytes((raw_size as f64 / compress_elapsed.as_secs_f64()) as u64)
    );
    println!(
        "  decode      : {}/s",
        human_bytes((raw_size as f64 / decode_elapsed.as_secs_f64()) as u64)
    );
    print_pool_stats(&ctx);
    Ok(())
}

fn run_bench(
    config: PoolConfig,
    compression: &str,
    order: &str,
    threads: usize,
    iterations: usize,
    block_count: usize,
    seed: u64,
) -> anyhow::Result<()> {
    if threads == 0 || iterations == 0 || block_count == 0 {
        anyhow::bail!("threads, iterations and blocks must all be non-zero");
    }
    let kind = parse_compression(compression)?;
    let order = parse_order(order)?;
    let values_per_block = config.block_size / 4;
    let ctx = Arc::new(CodecContext::new(config, default_registry())?);

    let strategy = strategy_for(kind);
    let blocks: Arc<Vec<(Vec<u8>, u64)>> = Arc::new(
        (0..block_count)
            .map(|i| {
                let raw = synthetic_block(values_per_block, order, seed.wrapping_add(i as u64));
                Ok((strategy.compress(&raw)?, xxh3_64(&raw)))
            })
            .collect::<colblock_core::Result<Vec<_>>>()?,
    );
    info!(
        %kind,
        %order,
        threads,
        iterations,
        blocks = block_count,
        "starting decode benchmark"
    );

    let t0 = Instant::now();
    let workers: Vec<_> = (0..threads)
        .map(|t| {
            let ctx = Arc::clone(&ctx);
            let blocks = Arc::clone(&blocks);
            thread::spawn(move || -> anyhow::Result<(Vec<u64>, u64)> {
                let codec = ctx.codec(order, kind)?;
                let mut rng = seed ^ (t as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
                let mut latencies_ns = Vec::with_capacity(iterations);
                let mut decoded = 0u64;
                for _ in 0..iterations {
                    rng = rng
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    let idx = ((rng >> 33) % blocks.len() as u64) as usize;
                    let (compressed, checksum) = &blocks[idx];

                    let t = Instant::now();
                    let block = codec.decode(compressed, compressed.len())?;
                    latencies_ns.push(t.elapsed().as_nanos() as u64);

                    if xxh3_64(block.payload()) != *checksum {
                        anyhow::bail!("block {} decoded to unexpected bytes", idx);
                    }
                    decoded += block.payload_len() as u64;
                    block.release();
                }
                Ok((latencies_ns, decoded))
            })
        })
        .collect();

    let mut latencies_ns = Vec::with_capacity(threads * iterations);
    let mut total_raw = 0u64;
    for worker in workers {
        let (lat, decoded) = worker
            .join()
            .map_err(|_| anyhow::anyhow!("decode worker panicked"))??;
        latencies_ns.extend(lat);
        total_raw += decoded;
    }
    let elapsed = t0.elapsed();
    latencies_ns.sort_unstable();

    let pct = |p: f64| latencies_ns[((latencies_ns.len() as f64 * p) as usize).min(latencies_ns.len() - 1)];

    println!();
    println!("=== Concurrent Block Decode Benchmark ===");
    println!("  compression : {}", kind);
    println!("  byte order  : {}", order);
    println!("  threads     : {}", threads);
    println!("  decodes     : {}", latencies_ns.len());
    println!("  total raw   : {}", human_bytes(total_raw));
    println!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    println!(
        "  throughput  : {}/s ({:.0} blocks/s)",
        human_bytes((total_raw as f64 / elapsed.as_secs_f64()) as u64),
        latencies_ns.len() as f64 / elapsed.as_secs_f64()
    );
    println!("  latency:");
    println!("    min  : {:.2} µs", latencies_ns[0] as f64 / 1000.0);
    println!("    p50  : {:.2} µs", pct(0.50) as f64 / 1000.0);
    println!("    p95  : {:.2} µs", pct(0.95) as f64 / 1000.0);
    println!("    p99  : {:.2} µs", pct(0.99) as f64 / 1000.0);
    println!("    max  : {:.2} µs", pct(1.0) as f64 / 1000.0);
    print_pool_stats(&ctx);
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.block_size)?;
    match cli.command {
        Commands::Roundtrip {
            input,
            compression,
            order,
        } => run_roundtrip(config, input, &compression, &order),
        Commands::Bench {
            compression,
            order,
            threads,
            iterations,
            blocks,
            seed,
        } => run_bench(config, &compression, &order, threads, iterations, blocks, seed),
    }
}
