use colblock_core::{CompressionKind, CompressionStrategy, Error, PooledBuffer, Result};

/// Zstandard block strategy.
///
/// Each block is one zstd frame compressed at the configured level
/// (default: 3). The level only affects `compress`; any frame decodes.
///
/// Best for: cold columns where size matters more than decode speed.
pub struct ZstdStrategy {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdStrategy {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdStrategy {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl CompressionStrategy for ZstdStrategy {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Zstd
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(raw, self.level).map_err(|e| Error::Compress {
            kind: self.kind(),
            reason: e.to_string(),
        })
    }

    fn decompress(&self, src: &[u8], dst: &mut PooledBuffer) -> Result<()> {
        // Decoding straight into the pooled buffer; a frame that needs more
        // room than the buffer has left is an error, not a reallocation.
        let written = zstd::bulk::decompress_to_buffer(src, dst.remaining_mut())
            .map_err(|e| Error::decode(self.kind(), format!("zstd decompress error: {}", e)))?;
        dst.advance(written)?;
        Ok(())
    }
}
