use std::fmt;

use crate::error::{Error, Result};

/// Default decoded block capacity: 64 KB.
///
/// Column writers never emit a block that decompresses to more than this, so
/// every pooled buffer is sized to it and any block fits any buffer.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Default upper bound on buffers allocated for a single byte order.
pub const DEFAULT_MAX_BUFFERS_PER_ORDER: usize = 1024;

// ── Compression IDs ────────────────────────────────────────────────────────
//
// These are the one-byte ids stored in column metadata next to each column's
// block table. They are part of the on-disk contract and must never change.

pub const COMPRESSION_LZ4: u8 = 0x01;
pub const COMPRESSION_ZSTD: u8 = 0x02;
pub const COMPRESSION_UNCOMPRESSED: u8 = 0xFF;

/// Bytes of little-endian decompressed length in front of every LZ4 block.
pub const LZ4_SIZE_PREFIX_LEN: usize = 4;

// ── Compression kind ───────────────────────────────────────────────────────

/// Block compression algorithm, as recorded in column metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompressionKind {
    Lz4,
    Zstd,
    Uncompressed,
}

impl CompressionKind {
    pub const ALL: [CompressionKind; 3] = [
        CompressionKind::Lz4,
        CompressionKind::Zstd,
        CompressionKind::Uncompressed,
    ];

    /// Stable on-disk id.
    pub fn id(self) -> u8 {
        match self {
            CompressionKind::Lz4 => COMPRESSION_LZ4,
            CompressionKind::Zstd => COMPRESSION_ZSTD,
            CompressionKind::Uncompressed => COMPRESSION_UNCOMPRESSED,
        }
    }

    /// Resolve an on-disk id, rejecting anything this build does not know.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            COMPRESSION_LZ4 => Ok(CompressionKind::Lz4),
            COMPRESSION_ZSTD => Ok(CompressionKind::Zstd),
            COMPRESSION_UNCOMPRESSED => Ok(CompressionKind::Uncompressed),
            other => Err(Error::UnknownCompression(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionKind::Lz4 => "lz4",
            CompressionKind::Zstd => "zstd",
            CompressionKind::Uncompressed => "uncompressed",
        }
    }

    /// Parse the names accepted on the command line and in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lz4" => Some(CompressionKind::Lz4),
            "zstd" => Some(CompressionKind::Zstd),
            "uncompressed" | "none" | "passthrough" => Some(CompressionKind::Uncompressed),
            _ => None,
        }
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
