use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::format::{DEFAULT_BLOCK_SIZE, DEFAULT_MAX_BUFFERS_PER_ORDER};

/// What `BufferPool::acquire` does once every buffer of an order is out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPolicy {
    /// Park the calling thread until another thread releases a buffer.
    /// Callers holding one handle while acquiring a second can deadlock
    /// if every buffer is held the same way; size the pool above the
    /// number of decoding threads times handles held per thread.
    #[default]
    Block,
    /// Return `Error::PoolExhausted` immediately.
    Fail,
}

/// Sizing of the decoded-block buffer pool, supplied by store configuration.
///
/// ```toml
/// block_size = 65536
/// max_buffers_per_order = 1024
/// initial_buffers_per_order = 16
/// exhaustion_policy = "block"
/// zero_fill_padding = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Capacity of every pooled buffer in bytes.
    pub block_size: usize,
    /// Upper bound on buffers allocated per byte order.
    pub max_buffers_per_order: usize,
    /// Buffers allocated eagerly per byte order when the pool is built.
    pub initial_buffers_per_order: usize,
    pub exhaustion_policy: ExhaustionPolicy,
    /// Zero the bytes between the decoded payload and the buffer capacity,
    /// so padding read by fixed-width readers never holds a previous block.
    pub zero_fill_padding: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_buffers_per_order: DEFAULT_MAX_BUFFERS_PER_ORDER,
            initial_buffers_per_order: 0,
            exhaustion_policy: ExhaustionPolicy::Block,
            zero_fill_padding: true,
        }
    }
}

impl PoolConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: PoolConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("reading {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be non-zero".into()));
        }
        // Block lengths travel as u32 in the LZ4 prefix and in column metadata.
        if self.block_size > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "block_size {} exceeds {}",
                self.block_size,
                u32::MAX
            )));
        }
        if self.max_buffers_per_order == 0 {
            return Err(Error::InvalidConfig(
                "max_buffers_per_order must be non-zero".into(),
            ));
        }
        if self.initial_buffers_per_order > self.max_buffers_per_order {
            return Err(Error::InvalidConfig(format!(
                "initial_buffers_per_order {} exceeds max_buffers_per_order {}",
                self.initial_buffers_per_order, self.max_buffers_per_order
            )));
        }
        Ok(())
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_max_buffers(mut self, max_buffers_per_order: usize) -> Self {
        self.max_buffers_per_order = max_buffers_per_order;
        self
    }

    pub fn with_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let cfg = PoolConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, PoolConfig::default());
        assert_eq!(cfg.block_size, 64 * 1024);
        assert_eq!(cfg.exhaustion_policy, ExhaustionPolicy::Block);
        assert!(cfg.zero_fill_padding);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let cfg = PoolConfig::from_toml_str(
            r#"
            block_size = 4096
            max_buffers_per_order = 8
            exhaustion_policy = "fail"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.block_size, 4096);
        assert_eq!(cfg.max_buffers_per_order, 8);
        assert_eq!(cfg.initial_buffers_per_order, 0);
        assert_eq!(cfg.exhaustion_policy, ExhaustionPolicy::Fail);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            PoolConfig::from_toml_str("block_size = 0"),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            PoolConfig::from_toml_str(
                "max_buffers_per_order = 2\ninitial_buffers_per_order = 3"
            ),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            PoolConfig::from_toml_str("blocksize = 10"),
            Err(Error::Config(_))
        ));
    }
}
