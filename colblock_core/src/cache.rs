use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::compression::StrategyRegistry;
use crate::decompressing::DecompressingBlockCodec;
use crate::error::Result;
use crate::format::CompressionKind;
use crate::order::ByteOrder;
use crate::pool::BufferPool;

/// Memoized [`DecompressingBlockCodec`] instances.
///
/// There are only a handful of (byte order, compression) combinations, but
/// one codec reference per column reader. Readers share the instance for
/// their key instead of each building its own. Entries are never evicted.
#[derive(Debug)]
pub struct CodecCache {
    pool: Arc<BufferPool>,
    registry: Arc<StrategyRegistry>,
    codecs: DashMap<(ByteOrder, CompressionKind), Arc<DecompressingBlockCodec>>,
}

impl CodecCache {
    pub fn new(pool: Arc<BufferPool>, registry: Arc<StrategyRegistry>) -> Self {
        Self {
            pool,
            registry,
            codecs: DashMap::new(),
        }
    }

    /// Codec for `(order, kind)`, built on first request.
    ///
    /// Every call with an equal key returns the same `Arc`, including calls
    /// that race on first creation: exactly one instance is installed.
    pub fn get_or_create(
        &self,
        order: ByteOrder,
        kind: CompressionKind,
    ) -> Result<Arc<DecompressingBlockCodec>> {
        if let Some(codec) = self.codecs.get(&(order, kind)) {
            return Ok(Arc::clone(&codec));
        }
        let strategy = Arc::clone(self.registry.get(kind)?);
        let codec = self
            .codecs
            .entry((order, kind))
            .or_insert_with(|| {
                debug!(%order, compression = %kind, "creating decompressing block codec");
                Arc::new(DecompressingBlockCodec::new(
                    order,
                    strategy,
                    Arc::clone(&self.pool),
                ))
            })
            .clone();
        Ok(codec)
    }

    /// Codec for an on-disk compression id.
    pub fn get_or_create_by_id(
        &self,
        order: ByteOrder,
        compression_id: u8,
    ) -> Result<Arc<DecompressingBlockCodec>> {
        self.get_or_create(order, CompressionKind::from_id(compression_id)?)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    #[inline]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    #[inline]
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }
}
