use thiserror::Error;

use crate::format::CompressionKind;
use crate::order::ByteOrder;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The source bytes are not a valid block for the algorithm. Never retried here.
    #[error("corrupt {kind} block: {reason}")]
    Decode {
        kind: CompressionKind,
        reason: String,
    },
    #[error("{kind} compression failed: {reason}")]
    Compress {
        kind: CompressionKind,
        reason: String,
    },
    /// Programming error: the codec does not advertise this capability.
    #[error("{operation} is not supported by {codec}")]
    Unsupported {
        codec: &'static str,
        operation: &'static str,
    },
    #[error("unknown compression id {0:#04x}")]
    UnknownCompression(u8),
    #[error("no strategy registered for {0} compression")]
    UnregisteredCompression(CompressionKind),
    // buffer pool errors
    #[error("buffer pool exhausted for {order} byte order ({max} buffers outstanding)")]
    PoolExhausted { order: ByteOrder, max: usize },
    #[error("read of {len} bytes at offset {offset} exceeds buffer limit {limit}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        limit: usize,
    },
    // configuration errors
    #[error("invalid pool config: {0}")]
    InvalidConfig(String),
    #[error("pool config parse error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("codec context already installed")]
    AlreadyInitialized,
    #[error("codec context not installed")]
    NotInitialized,
}

impl Error {
    #[inline]
    pub fn decode(kind: CompressionKind, reason: impl Into<String>) -> Self {
        Error::Decode {
            kind,
            reason: reason.into(),
        }
    }

    /// True for errors caused by bad input data rather than by the caller.
    #[inline]
    pub fn is_data_corruption(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}
