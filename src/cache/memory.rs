use chrono::Utc;
use rustc_hash::FxHashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use super::{CacheStats, CacheStore};
use crate::core::error::{Result, UrlProbeError};
use crate::core::types::ValidationResult;

/// A cached result together with when it was recorded.
///
/// Entries are immutable once written; a newer `put` replaces the whole
/// entry. Equality is by URL.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: ValidationResult,
    /// Epoch seconds at the time of the write
    pub recorded_at: i64,
    pub ttl_secs: u64,
}

impl CacheEntry {
    fn new(result: ValidationResult, ttl: Duration) -> Self {
        Self {
            result,
            recorded_at: Utc::now().timestamp(),
            ttl_secs: ttl.as_secs(),
        }
    }

    pub fn age_secs(&self, now: i64) -> i64 {
        now - self.recorded_at
    }

    pub fn is_expired(&self, now: i64) -> bool {
        // A TTL beyond i64 seconds never expires
        i64::try_from(self.ttl_secs).is_ok_and(|ttl| self.age_secs(now) >= ttl)
    }
}

impl PartialEq for CacheEntry {
    fn eq(&self, other: &Self) -> bool {
        self.result.url == other.result.url
    }
}

impl Eq for CacheEntry {}

/// Volatile cache shared by every validation worker in the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<FxHashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, FxHashMap<String, CacheEntry>>> {
        self.entries
            .read()
            .map_err(|_| UrlProbeError::Storage("memory cache lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, FxHashMap<String, CacheEntry>>> {
        self.entries
            .write()
            .map_err(|_| UrlProbeError::Storage("memory cache lock poisoned".to_string()))
    }
}

impl CacheStore for MemoryCache {
    fn lookup(&self, url: &str) -> Result<Option<ValidationResult>> {
        let now = Utc::now().timestamp();
        {
            let entries = self.read()?;
            match entries.get(url) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.result.clone())),
                Some(_) => {}
            }
        }

        // Another writer may have refreshed the entry since the read lock
        // was released
        let mut entries = self.write()?;
        if entries.get(url).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(url);
        }
        Ok(None)
    }

    fn put(&self, url: &str, result: &ValidationResult, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(result.clone(), ttl);
        self.write()?.insert(url.to_string(), entry);
        Ok(())
    }

    fn sweep(&self, max_age_minutes: u64) -> Result<usize> {
        let now = Utc::now().timestamp();
        // Out-of-range ages only sweep expired entries
        let max_age_secs = max_age_minutes
            .checked_mul(60)
            .and_then(|secs| i64::try_from(secs).ok());
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, entry| {
            !entry.is_expired(now) && max_age_secs.is_none_or(|max| entry.age_secs(now) < max)
        });
        Ok(before - entries.len())
    }

    fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now().timestamp();
        let entries = self.read()?;
        Ok(CacheStats {
            size: entries.len(),
            expired_count: entries.values().filter(|e| e.is_expired(now)).count(),
        })
    }

    fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
