use std::fmt;
use std::sync::Arc;

use crate::compression::CompressionStrategy;
use crate::error::{Error, Result};
use crate::format::CompressionKind;
use crate::holder::BufferHolder;
use crate::order::ByteOrder;
use crate::pool::BufferPool;
use crate::strategy::{Capabilities, ObjectStrategy};

/// Decodes compressed column blocks into pooled buffers.
///
/// Immutable once built: a byte order, a decompressor and the pool to draw
/// buffers from. Instances are meant to be shared through
/// [`CodecCache`](crate::cache::CodecCache) rather than built per reader.
///
/// Read-only: blocks are already compressed on disk, so `to_bytes` and
/// `compare` are unsupported and [`capabilities`](ObjectStrategy::capabilities)
/// is empty.
pub struct DecompressingBlockCodec {
    order: ByteOrder,
    strategy: Arc<dyn CompressionStrategy>,
    pool: Arc<BufferPool>,
}

impl DecompressingBlockCodec {
    pub fn new(
        order: ByteOrder,
        strategy: Arc<dyn CompressionStrategy>,
        pool: Arc<BufferPool>,
    ) -> Self {
        Self {
            order,
            strategy,
            pool,
        }
    }

    #[inline]
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    #[inline]
    pub fn compression(&self) -> CompressionKind {
        self.strategy.kind()
    }

    #[inline]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Decode one block. Alias of [`ObjectStrategy::from_bytes`].
    #[inline]
    pub fn decode(&self, src: &[u8], num_bytes: usize) -> Result<BufferHolder> {
        self.from_bytes(src, num_bytes)
    }
}

impl ObjectStrategy for DecompressingBlockCodec {
    type Value = BufferHolder;

    fn name(&self) -> &'static str {
        "decompressing-block"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Decode `src[..num_bytes]` into a buffer from the pool.
    ///
    /// The returned buffer's readable range is its full capacity, not the
    /// decoded length: readers of packed fixed-width values fetch whole
    /// words that can extend past the last value. With
    /// `zero_fill_padding` those trailing bytes are zero.
    fn from_bytes(&self, src: &[u8], num_bytes: usize) -> Result<BufferHolder> {
        let compressed = src.get(..num_bytes).ok_or_else(|| {
            Error::decode(
                self.strategy.kind(),
                format!(
                    "block claims {} compressed bytes but only {} are available",
                    num_bytes,
                    src.len()
                ),
            )
        })?;

        // On any error below `holder` drops and the buffer goes straight back.
        let mut holder = self.pool.acquire(self.order)?;
        let buf = holder.get_mut();
        buf.clear();
        self.strategy.decompress(compressed, buf)?;
        buf.seal_full_capacity(self.pool.config().zero_fill_padding);
        Ok(holder)
    }
}

impl fmt::Debug for DecompressingBlockCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecompressingBlockCodec")
            .field("order", &self.order)
            .field("compression", &self.strategy.kind())
            .finish()
    }
}
