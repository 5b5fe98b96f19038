pub mod cache;
pub mod compression;
pub mod config;
pub mod context;
pub mod decompressing;
pub mod error;
pub mod format;
pub mod holder;
pub mod order;
pub mod pool;
pub mod strategy;

pub use cache::CodecCache;
pub use compression::{CompressionStrategy, StrategyRegistry};
pub use config::{ExhaustionPolicy, PoolConfig};
pub use context::CodecContext;
pub use decompressing::DecompressingBlockCodec;
pub use error::{Error, Result};
pub use format::CompressionKind;
pub use holder::BufferHolder;
pub use order::ByteOrder;
pub use pool::{BufferPool, PoolStats, PooledBuffer};
pub use strategy::{Capabilities, ObjectStrategy, RawBytesStrategy};
