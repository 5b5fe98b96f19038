mod lz4_codec;
mod passthrough;
mod zstd_codec;

pub use lz4_codec::Lz4Strategy;
pub use passthrough::PassThroughStrategy;
pub use zstd_codec::ZstdStrategy;

use colblock_core::{CompressionKind, CompressionStrategy, StrategyRegistry};
use std::sync::Arc;

/// Strategy for a compression kind, with default settings.
pub fn strategy_for(kind: CompressionKind) -> Arc<dyn CompressionStrategy> {
    match kind {
        CompressionKind::Lz4 => Arc::new(Lz4Strategy),
        CompressionKind::Zstd => Arc::new(ZstdStrategy::default()),
        CompressionKind::Uncompressed => Arc::new(PassThroughStrategy),
    }
}

/// Resolve a strategy from the one-byte id stored in column metadata.
pub fn strategy_by_id(id: u8) -> colblock_core::Result<Arc<dyn CompressionStrategy>> {
    CompressionKind::from_id(id).map(strategy_for)
}

/// Registry holding every bundled strategy.
///
/// Called once at store startup and handed to `CodecContext::new`.
pub fn default_registry() -> StrategyRegistry {
    CompressionKind::ALL
        .into_iter()
        .fold(StrategyRegistry::new(), |registry, kind| {
            registry.with(strategy_for(kind))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_all_kinds() {
        let registry = default_registry();
        assert_eq!(registry.len(), CompressionKind::ALL.len());
        for kind in CompressionKind::ALL {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
            assert_eq!(strategy_by_id(kind.id()).unwrap().kind(), kind);
        }
        assert!(strategy_by_id(0x00).is_err());
    }
}
