use std::fmt;

use serde::Deserialize;

/// Endianness used to interpret multi-byte values inside a decoded block.
///
/// Fixed per column at write time. The pool keeps buffers for each order in
/// a separate partition, so a buffer tagged `Big` is never handed to a
/// reader that asked for `Little`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    pub const ALL: [ByteOrder; 2] = [ByteOrder::Big, ByteOrder::Little];

    #[inline]
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Dense index used for per-order pool partitions.
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            ByteOrder::Big => 0,
            ByteOrder::Little => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "big" | "be" => Some(ByteOrder::Big),
            "little" | "le" => Some(ByteOrder::Little),
            "native" => Some(ByteOrder::native()),
            _ => None,
        }
    }

    #[inline]
    pub fn u16_from(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Big => u16::from_be_bytes(b),
            ByteOrder::Little => u16::from_le_bytes(b),
        }
    }

    #[inline]
    pub fn u32_from(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Big => u32::from_be_bytes(b),
            ByteOrder::Little => u32::from_le_bytes(b),
        }
    }

    #[inline]
    pub fn u64_from(self, b: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Big => u64::from_be_bytes(b),
            ByteOrder::Little => u64::from_le_bytes(b),
        }
    }

    #[inline]
    pub fn u32_to(self, v: u32) -> [u8; 4] {
        match self {
            ByteOrder::Big => v.to_be_bytes(),
            ByteOrder::Little => v.to_le_bytes(),
        }
    }

    #[inline]
    pub fn u64_to(self, v: u64) -> [u8; 8] {
        match self {
            ByteOrder::Big => v.to_be_bytes(),
            ByteOrder::Little => v.to_le_bytes(),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Big => f.write_str("big-endian"),
            ByteOrder::Little => f.write_str("little-endian"),
        }
    }
}
