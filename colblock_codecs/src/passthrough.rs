use colblock_core::{CompressionKind, CompressionStrategy, Error, PooledBuffer, Result};

/// No-op strategy: blocks are stored verbatim.
///
/// Used for columns where compression would not pay for itself, e.g.
/// already-dense bitmaps or tiny segments.
pub struct PassThroughStrategy;

impl CompressionStrategy for PassThroughStrategy {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Uncompressed
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn decompress(&self, src: &[u8], dst: &mut PooledBuffer) -> Result<()> {
        if src.len() > dst.remaining() {
            return Err(Error::decode(
                self.kind(),
                format!(
                    "{} byte block exceeds {} bytes of buffer space",
                    src.len(),
                    dst.remaining()
                ),
            ));
        }
        dst.put_slice(src)
    }
}
