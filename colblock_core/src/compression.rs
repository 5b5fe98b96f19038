use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::format::CompressionKind;
use crate::pool::PooledBuffer;

/// Block compression algorithm.
///
/// Each implementation:
/// - Is identified by a [`CompressionKind`] whose id is stored in column metadata.
/// - Holds no mutable state: one instance is shared by every codec and thread
///   that reads blocks of its kind.
/// - Compresses and decompresses blocks independently; no cross-block state.
pub trait CompressionStrategy: Send + Sync {
    fn kind(&self) -> CompressionKind;

    /// Human-readable name for logs and CLI display.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Compress a single block.
    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>>;

    /// Decompress `src` into `dst`, starting at `dst.position()` and advancing
    /// the position by the decoded length.
    ///
    /// Must return [`Error::Decode`] when `src` is corrupt or truncated, or
    /// when the decoded payload would not fit in the remaining capacity.
    /// Partial output is never reported as success.
    fn decompress(&self, src: &[u8], dst: &mut PooledBuffer) -> Result<()>;
}

/// The set of compression strategies a store can read, keyed by kind.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<CompressionKind, Arc<dyn CompressionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under its own kind, replacing any previous one.
    pub fn register(&mut self, strategy: Arc<dyn CompressionStrategy>) -> &mut Self {
        self.strategies.insert(strategy.kind(), strategy);
        self
    }

    pub fn with(mut self, strategy: Arc<dyn CompressionStrategy>) -> Self {
        self.register(strategy);
        self
    }

    pub fn get(&self, kind: CompressionKind) -> Result<&Arc<dyn CompressionStrategy>> {
        self.strategies
            .get(&kind)
            .ok_or(Error::UnregisteredCompression(kind))
    }

    /// Resolve an on-disk compression id.
    pub fn by_id(&self, id: u8) -> Result<&Arc<dyn CompressionStrategy>> {
        self.get(CompressionKind::from_id(id)?)
    }

    pub fn kinds(&self) -> impl Iterator<Item = CompressionKind> + '_ {
        self.strategies.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.kinds().collect();
        kinds.sort();
        f.debug_struct("StrategyRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CopyStrategy;
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = StrategyRegistry::new().with(Arc::new(CopyStrategy));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.by_id(0xFF).unwrap().kind(),
            CompressionKind::Uncompressed
        );
        assert!(matches!(
            registry.get(CompressionKind::Lz4),
            Err(Error::UnregisteredCompression(CompressionKind::Lz4))
        ));
        assert!(matches!(
            registry.by_id(0x7A),
            Err(Error::UnknownCompression(0x7A))
        ));
    }
}
