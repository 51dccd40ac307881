//! Durable cache backed by one JSON document per partition.
//!
//! Rows are kept in insertion order. `url` is meant to be unique, but `put`
//! checks for an existing row and inserts under separate locks, so writers
//! racing on the same URL can each append a row. Those duplicates are left
//! for `repair::Reconciler` to remove; lookups always read the first live row.

use chrono::{DateTime, Utc};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use super::{CacheStats, CacheStore};
use crate::config::is_valid_partition_name;
use crate::core::error::{Result, UrlProbeError};
use crate::core::types::ValidationResult;

pub const DOCUMENT_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct DurableCache {
    path: PathBuf,
    partition: String,
    rows: RwLock<Vec<ValidationResult>>,
}

impl DurableCache {
    /// Open (or start) the document for `partition` under `dir`.
    pub fn open<P: AsRef<Path>>(dir: P, partition: &str) -> Result<Self> {
        if !is_valid_partition_name(partition) {
            return Err(UrlProbeError::InvalidArgument(format!(
                "invalid partition name '{partition}'"
            )));
        }

        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = document_path(dir, partition);
        let rows = if path.exists() {
            load_rows(&path)?
        } else {
            Vec::new()
        };
        debug!(
            "Opened durable cache '{}' with {} row(s)",
            path.display(),
            rows.len()
        );

        Ok(Self {
            path,
            partition: partition.to_string(),
            rows: RwLock::new(rows),
        })
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored row, duplicates and expired rows included
    pub fn rows(&self) -> Result<Vec<ValidationResult>> {
        Ok(self.read()?.clone())
    }

    /// Delete rows whose `expiresAt` has passed.
    pub fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now();
        self.remove_where(|row| row.is_expired_at(now))
    }

    fn remove_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&ValidationResult) -> bool,
    {
        let mut rows = self.write()?;
        let before = rows.len();
        rows.retain(|row| !predicate(row));
        let removed = before - rows.len();
        if removed > 0 {
            write_rows(&self.path, &rows)?;
        }
        Ok(removed)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<ValidationResult>>> {
        self.rows
            .read()
            .map_err(|_| UrlProbeError::Storage("durable cache lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<ValidationResult>>> {
        self.rows
            .write()
            .map_err(|_| UrlProbeError::Storage("durable cache lock poisoned".to_string()))
    }
}

impl CacheStore for DurableCache {
    fn lookup(&self, url: &str) -> Result<Option<ValidationResult>> {
        let now = Utc::now();
        let has_expired = {
            let rows = self.read()?;
            let mut has_expired = false;
            for row in rows.iter().filter(|row| row.url == url) {
                if !row.is_expired_at(now) {
                    return Ok(Some(row.clone()));
                }
                has_expired = true;
            }
            has_expired
        };

        if has_expired {
            self.remove_where(|row| row.url == url && row.is_expired_at(now))?;
        }
        Ok(None)
    }

    fn put(&self, url: &str, result: &ValidationResult, ttl: Duration) -> Result<()> {
        let existing = self.read()?.iter().position(|row| row.url == url);

        let mut row = result.clone();
        row.url = url.to_string();
        row.expires_at = Some(expiry(ttl));

        let mut rows = self.write()?;
        match existing {
            Some(index) if rows.get(index).is_some_and(|r| r.url == url) => rows[index] = row,
            // Either new, or the row moved while unlocked; append either way
            _ => rows.push(row),
        }
        write_rows(&self.path, &rows)
    }

    fn sweep(&self, max_age_minutes: u64) -> Result<usize> {
        let now = Utc::now();
        // Out-of-range ages only sweep expired rows
        let cutoff = i64::try_from(max_age_minutes)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .and_then(|max_age| now.checked_sub_signed(max_age));
        self.remove_where(|row| {
            row.is_expired_at(now) || cutoff.is_some_and(|cutoff| row.validated_at <= cutoff)
        })
    }

    fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now();
        let rows = self.read()?;
        Ok(CacheStats {
            size: rows.len(),
            expired_count: rows.iter().filter(|row| row.is_expired_at(now)).count(),
        })
    }

    fn clear(&self) -> Result<()> {
        let mut rows = self.write()?;
        rows.clear();
        write_rows(&self.path, &rows)
    }

    fn backend(&self) -> &'static str {
        "durable"
    }
}

fn expiry(ttl: Duration) -> DateTime<Utc> {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
    let now = Utc::now();
    now.checked_add_signed(ttl).unwrap_or(now)
}

pub fn document_path(dir: &Path, partition: &str) -> PathBuf {
    dir.join(format!("{partition}.{DOCUMENT_EXTENSION}"))
}

/// Read every row of a partition document in stored order.
pub fn load_rows(path: &Path) -> Result<Vec<ValidationResult>> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&content).map_err(|e| {
        UrlProbeError::Storage(format!("corrupt cache document '{}': {e}", path.display()))
    })
}

/// Replace a partition document; written to a sibling file then renamed.
pub fn write_rows(path: &Path, rows: &[ValidationResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(rows)?;
    let tmp = path.with_extension(format!("{DOCUMENT_EXTENSION}.tmp"));
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    fn result(url: &str) -> ValidationResult {
        let mut result = ValidationResult::pending(url);
        result.status_code = 200;
        result.content_type = Some("application/pdf".to_string());
        result.succeed();
        result
    }

    #[test]
    fn test_open__rejects_bad_partition() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DurableCache::open(dir.path(), "../escape").is_err());
        assert!(DurableCache::open(dir.path(), "").is_err());
    }

    #[test]
    fn test_put_then_lookup__sets_expiry() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = DurableCache::open(dir.path(), "default")?;
        cache.put("https://example.com/a.pdf", &result("https://example.com/a.pdf"), HOUR)?;

        let found = cache.lookup("https://example.com/a.pdf")?.unwrap();
        assert!(found.is_ok());
        assert!(found.expires_at.unwrap() > Utc::now());
        assert_eq!(cache.lookup("https://example.com/b.pdf")?, None);
        Ok(())
    }

    #[test]
    fn test_put__overwrites_existing_row() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = DurableCache::open(dir.path(), "default")?;
        let mut second = result("https://example.com");
        second.status_code = 204;

        cache.put("https://example.com", &result("https://example.com"), HOUR)?;
        cache.put("https://example.com", &second, HOUR)?;

        assert_eq!(cache.rows()?.len(), 1);
        assert_eq!(cache.lookup("https://example.com")?.unwrap().status_code, 204);
        Ok(())
    }

    #[test]
    fn test_rows_survive_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        {
            let cache = DurableCache::open(dir.path(), "alpha")?;
            cache.put("https://a.com", &result("https://a.com"), HOUR)?;
            cache.put("https://b.com", &result("https://b.com"), HOUR)?;
        }

        let reopened = DurableCache::open(dir.path(), "alpha")?;
        let urls: Vec<String> = reopened.rows()?.into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
        assert!(reopened.lookup("https://b.com")?.is_some());
        Ok(())
    }

    #[test]
    fn test_lookup__expired_row_is_miss_and_purged() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = DurableCache::open(dir.path(), "default")?;
        cache.put("https://example.com", &result("https://example.com"), Duration::ZERO)?;

        assert_eq!(cache.lookup("https://example.com")?, None);
        assert!(cache.rows()?.is_empty());
        assert!(load_rows(cache.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_lookup__skips_expired_duplicate() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = document_path(dir.path(), "default");
        let mut stale = result("https://example.com");
        stale.expires_at = Some(Utc::now() - chrono::Duration::minutes(1));
        let mut live = result("https://example.com");
        live.status_code = 201;
        live.expires_at = Some(Utc::now() + chrono::Duration::minutes(10));
        write_rows(&path, &[stale, live])?;

        let cache = DurableCache::open(dir.path(), "default")?;
        assert_eq!(cache.lookup("https://example.com")?.unwrap().status_code, 201);
        Ok(())
    }

    #[test]
    fn test_cleanup_expired_and_stats() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = DurableCache::open(dir.path(), "default")?;
        cache.put("https://a.com", &result("https://a.com"), HOUR)?;
        cache.put("https://b.com", &result("https://b.com"), Duration::ZERO)?;

        assert_eq!(
            cache.stats()?,
            CacheStats {
                size: 2,
                expired_count: 1
            }
        );
        assert_eq!(cache.cleanup_expired()?, 1);
        assert_eq!(cache.stats()?.size, 1);
        Ok(())
    }

    #[test]
    fn test_sweep__removes_rows_older_than_max_age() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = DurableCache::open(dir.path(), "default")?;
        let mut old = result("https://old.com");
        old.validated_at = Utc::now() - chrono::Duration::minutes(30);
        cache.put("https://old.com", &old, HOUR)?;
        cache.put("https://new.com", &result("https://new.com"), HOUR)?;

        assert_eq!(cache.sweep(10)?, 1);
        assert!(cache.lookup("https://new.com")?.is_some());
        assert!(cache.lookup("https://old.com")?.is_none());
        Ok(())
    }

    #[test]
    fn test_sweep__huge_max_age_keeps_live_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = DurableCache::open(dir.path(), "default")?;
        cache.put("https://live.com", &result("https://live.com"), HOUR)?;
        cache.put("https://gone.com", &result("https://gone.com"), Duration::ZERO)?;

        assert_eq!(cache.sweep(1_000_000_000_000)?, 1);
        assert_eq!(cache.sweep(u64::MAX)?, 0);
        assert!(cache.lookup("https://live.com")?.is_some());
        Ok(())
    }

    #[test]
    fn test_clear__empties_document() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = DurableCache::open(dir.path(), "default")?;
        cache.put("https://a.com", &result("https://a.com"), HOUR)?;
        cache.clear()?;

        assert!(load_rows(cache.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_rows__corrupt_document_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = document_path(dir.path(), "broken");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            DurableCache::open(dir.path(), "broken"),
            Err(UrlProbeError::Storage(_))
        ));
    }

    #[test]
    fn test_concurrent_writers__keep_a_live_row() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = Arc::new(DurableCache::open(dir.path(), "default")?);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache
                        .put("https://race.com", &result("https://race.com"), HOUR)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Racing writers may leave duplicates, but never zero rows
        let rows = cache.rows()?;
        assert!(!rows.is_empty() && rows.len() <= 8);
        assert!(rows.iter().all(|row| row.url == "https://race.com"));
        assert!(cache.lookup("https://race.com")?.is_some());
        Ok(())
    }
}
