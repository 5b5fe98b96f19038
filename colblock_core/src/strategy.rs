use std::cmp::Ordering;

use bitflags::bitflags;

use crate::error::{Error, Result};

bitflags! {
    /// Optional operations an [`ObjectStrategy`] supports beyond decoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `to_bytes` produces bytes that `from_bytes` reads back.
        const ENCODE = 0b0000_0001;
        /// `compare` orders values without a full decode.
        const COMPARE = 0b0000_0010;
    }
}

/// Converts between a byte range and a typed in-memory value.
///
/// This is the seam that lets column storage treat compressed blocks, raw
/// values and other encodings uniformly. Callers check
/// [`capabilities`](ObjectStrategy::capabilities) before calling `to_bytes`
/// or `compare`; strategies without the capability return
/// [`Error::Unsupported`] instead of a wrong answer.
pub trait ObjectStrategy: Send + Sync {
    type Value;

    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    /// Decode the first `num_bytes` bytes of `src`.
    fn from_bytes(&self, src: &[u8], num_bytes: usize) -> Result<Self::Value>;

    fn to_bytes(&self, _value: &Self::Value) -> Result<Vec<u8>> {
        Err(self.unsupported("to_bytes"))
    }

    fn compare(&self, _a: &Self::Value, _b: &Self::Value) -> Result<Ordering> {
        Err(self.unsupported("compare"))
    }

    #[inline]
    fn can_compare(&self) -> bool {
        self.capabilities().contains(Capabilities::COMPARE)
    }

    #[inline]
    fn can_encode(&self) -> bool {
        self.capabilities().contains(Capabilities::ENCODE)
    }

    #[inline]
    fn unsupported(&self, operation: &'static str) -> Error {
        Error::Unsupported {
            codec: self.name(),
            operation,
        }
    }
}

/// Plain byte-string values, copied out of the source and ordered
/// lexicographically. Used for uncompressed variable-width columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesStrategy;

impl ObjectStrategy for RawBytesStrategy {
    type Value = Vec<u8>;

    fn name(&self) -> &'static str {
        "raw-bytes"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ENCODE | Capabilities::COMPARE
    }

    fn from_bytes(&self, src: &[u8], num_bytes: usize) -> Result<Vec<u8>> {
        src.get(..num_bytes)
            .map(<[u8]>::to_vec)
            .ok_or(Error::OutOfBounds {
                offset: 0,
                len: num_bytes,
                limit: src.len(),
            })
    }

    fn to_bytes(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn compare(&self, a: &Vec<u8>, b: &Vec<u8>) -> Result<Ordering> {
        Ok(a.cmp(b))
    }
}
