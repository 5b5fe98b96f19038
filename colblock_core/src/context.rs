use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::cache::CodecCache;
use crate::compression::StrategyRegistry;
use crate::config::PoolConfig;
use crate::decompressing::DecompressingBlockCodec;
use crate::error::{Error, Result};
use crate::format::CompressionKind;
use crate::order::ByteOrder;
use crate::pool::BufferPool;

static GLOBAL: OnceCell<Arc<CodecContext>> = OnceCell::new();

/// Everything a store needs to decode blocks: the buffer pool, the
/// compression strategies it can read and the shared codec instances.
///
/// Built explicitly at store startup and passed to column readers. Tests
/// build their own, so no state leaks between them; [`install`] exists for
/// callers that cannot thread a context through.
#[derive(Debug)]
pub struct CodecContext {
    cache: CodecCache,
}

impl CodecContext {
    pub fn new(config: PoolConfig, registry: StrategyRegistry) -> Result<Self> {
        let pool = BufferPool::new(config)?;
        info!(
            block_size = pool.block_size(),
            max_buffers_per_order = pool.config().max_buffers_per_order,
            compressions = ?registry,
            "codec context initialized"
        );
        Ok(Self {
            cache: CodecCache::new(pool, Arc::new(registry)),
        })
    }

    #[inline]
    pub fn codec(
        &self,
        order: ByteOrder,
        kind: CompressionKind,
    ) -> Result<Arc<DecompressingBlockCodec>> {
        self.cache.get_or_create(order, kind)
    }

    #[inline]
    pub fn cache(&self) -> &CodecCache {
        &self.cache
    }

    #[inline]
    pub fn pool(&self) -> &Arc<BufferPool> {
        self.cache.pool()
    }

    #[inline]
    pub fn registry(&self) -> &StrategyRegistry {
        self.cache.registry()
    }
}

/// Install the process-wide context. Fails if one is already installed.
pub fn install(ctx: CodecContext) -> Result<Arc<CodecContext>> {
    let ctx = Arc::new(ctx);
    GLOBAL
        .set(Arc::clone(&ctx))
        .map_err(|_| Error::AlreadyInitialized)?;
    Ok(ctx)
}

/// The process-wide context installed by [`install`].
pub fn global() -> Result<&'static Arc<CodecContext>> {
    GLOBAL.get().ok_or(Error::NotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::testing::CopyStrategy;

    fn ctx() -> CodecContext {
        CodecContext::new(
            PoolConfig::default().with_block_size(128),
            StrategyRegistry::new().with(Arc::new(CopyStrategy)),
        )
        .unwrap()
    }

    #[test]
    fn test_contexts_are_isolated() {
        let a = ctx();
        let b = ctx();
        let ca = a.codec(ByteOrder::Big, CompressionKind::Uncompressed).unwrap();
        let cb = b.codec(ByteOrder::Big, CompressionKind::Uncompressed).unwrap();
        assert!(!Arc::ptr_eq(&ca, &cb));
        let _h = ca.decode(b"abc", 3).unwrap();
        assert_eq!(a.pool().outstanding(), 1);
        assert_eq!(b.pool().outstanding(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = CodecContext::new(
            PoolConfig::default().with_max_buffers(0),
            StrategyRegistry::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    // The only test in this crate that touches the global slot.
    #[test]
    fn test_install_once() {
        let installed = install(ctx()).unwrap();
        assert!(Arc::ptr_eq(global().unwrap(), &installed));
        assert!(matches!(install(ctx()), Err(Error::AlreadyInitialized)));
    }
}
