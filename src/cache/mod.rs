//! Result caching
//!
//! Two interchangeable stores share the `CacheStore` contract: a volatile
//! in-process map and a durable per-partition JSON document. Both are
//! constructed explicitly and shared through `Arc`; there is no global cache.

pub mod durable;
pub mod memory;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::core::error::Result;
use crate::core::types::ValidationResult;

pub use durable::DurableCache;
pub use memory::{CacheEntry, MemoryCache};

/// Size counters reported by `CacheStore::stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub expired_count: usize,
}

pub trait CacheStore: Send + Sync {
    /// Live result for `url`, if any. Expired hits are purged and reported
    /// as a miss.
    fn lookup(&self, url: &str) -> Result<Option<ValidationResult>>;

    /// Store `result` under `url`; the last write wins.
    fn put(&self, url: &str, result: &ValidationResult, ttl: Duration) -> Result<()>;

    /// Remove expired entries and entries recorded more than
    /// `max_age_minutes` ago. Returns the number removed.
    fn sweep(&self, max_age_minutes: u64) -> Result<usize>;

    fn stats(&self) -> Result<CacheStats>;

    fn clear(&self) -> Result<()>;

    /// Short backend name for logs and output
    fn backend(&self) -> &'static str;
}

/// Open the store selected by `config`: durable when a cache directory is
/// configured, in-memory otherwise.
pub fn open_cache(config: &Config) -> Result<Arc<dyn CacheStore>> {
    match config.cache_dir {
        Some(ref dir) => Ok(Arc::new(DurableCache::open(dir, config.partition())?)),
        None => Ok(Arc::new(MemoryCache::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_cache_defaults_to_memory() -> Result<()> {
        let cache = open_cache(&Config::default())?;
        assert_eq!(cache.backend(), "memory");
        assert_eq!(cache.stats()?, CacheStats::default());
        Ok(())
    }

    #[test]
    fn test_open_cache_durable_when_dir_configured() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config {
            cache_dir: Some(dir.path().display().to_string()),
            partition: Some("alpha".to_string()),
            ..Default::default()
        };

        let cache = open_cache(&config)?;
        assert_eq!(cache.backend(), "durable");

        cache.put(
            "https://example.com",
            &ValidationResult::pending("https://example.com"),
            Duration::from_secs(60),
        )?;
        assert!(dir.path().join("alpha.json").exists());
        Ok(())
    }
}
