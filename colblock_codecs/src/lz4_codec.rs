use colblock_core::format::LZ4_SIZE_PREFIX_LEN;
use colblock_core::{CompressionKind, CompressionStrategy, Error, PooledBuffer, Result};
use lz4_flex::block::decompress_into;
use lz4_flex::compress_prepend_size;

/// LZ4 block strategy.
///
/// Layout: `[decompressed_len: u32 LE][lz4 block]`. The prefix lets the
/// decoder check the output fits before touching the buffer and reject
/// blocks that decode to fewer bytes than they claim.
///
/// Fastest decode of the bundled strategies; the default for hot columns.
pub struct Lz4Strategy;

impl Lz4Strategy {
    fn corrupt(reason: String) -> Error {
        Error::decode(CompressionKind::Lz4, reason)
    }
}

impl CompressionStrategy for Lz4Strategy {
    fn kind(&self) -> CompressionKind {
        CompressionKind::Lz4
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(compress_prepend_size(raw))
    }

    fn decompress(&self, src: &[u8], dst: &mut PooledBuffer) -> Result<()> {
        let Some((prefix, body)) = src.split_first_chunk::<LZ4_SIZE_PREFIX_LEN>() else {
            return Err(Self::corrupt(format!(
                "{} byte block is shorter than the {} byte length prefix",
                src.len(),
                LZ4_SIZE_PREFIX_LEN
            )));
        };
        let expected = u32::from_le_bytes(*prefix) as usize;
        if expected > dst.remaining() {
            return Err(Self::corrupt(format!(
                "block claims {} decompressed bytes, buffer has {}",
                expected,
                dst.remaining()
            )));
        }

        let out = &mut dst.remaining_mut()[..expected];
        let written = decompress_into(body, out)
            .map_err(|e| Self::corrupt(format!("lz4 decompress error: {}", e)))?;
        if written != expected {
            return Err(Self::corrupt(format!(
                "block decompressed to {} bytes but claims {}",
                written, expected
            )));
        }
        dst.advance(written)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colblock_core::{BufferPool, ByteOrder, PoolConfig};

    fn decode(src: &[u8]) -> Result<Vec<u8>> {
        let pool = BufferPool::new(PoolConfig::default().with_block_size(4096)).unwrap();
        let mut h = pool.acquire(ByteOrder::Little)?;
        Lz4Strategy.decompress(src, h.get_mut())?;
        let n = h.position();
        Ok(h.as_slice()[..n].to_vec())
    }

    #[test]
    fn test_round_trip() {
        let raw: Vec<u8> = (0..3000u32).flat_map(|i| (i % 17).to_le_bytes()).take(3000).collect();
        let compressed = Lz4Strategy.compress(&raw).unwrap();
        assert!(compressed.len() < raw.len());
        assert_eq!(decode(&compressed).unwrap(), raw);
    }

    #[test]
    fn test_truncated_block_is_decode_failure() {
        // One byte of body claiming 1000 bytes of output.
        let mut src = 1000u32.to_le_bytes().to_vec();
        src.push(0x10);
        let err = decode(&src).unwrap_err();
        assert!(err.is_data_corruption(), "{}", err);

        let compressed = Lz4Strategy.compress(&[7u8; 1000]).unwrap();
        let err = decode(&compressed[..compressed.len() - 1]).unwrap_err();
        assert!(err.is_data_corruption(), "{}", err);
    }

    #[test]
    fn test_missing_prefix_and_oversized_claims() {
        assert!(decode(&[0x01]).unwrap_err().is_data_corruption());
        let mut src = 1_000_000u32.to_le_bytes().to_vec();
        src.extend_from_slice(&[0u8; 8]);
        assert!(decode(&src).unwrap_err().is_data_corruption());
    }

    #[test]
    fn test_short_output_rejected() {
        // A valid block for 10 bytes, relabelled as 20.
        let mut compressed = Lz4Strategy.compress(&[3u8; 10]).unwrap();
        compressed[..4].copy_from_slice(&20u32.to_le_bytes());
        assert!(decode(&compressed).unwrap_err().is_data_corruption());
    }
}
