use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::DashboardPayload;
use crate::utils::{age_display, hours_one_decimal};

/// On-disk format version. Records written by another version are ignored.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Persisted dashboard payload plus poll metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub version: u32,
    pub payload: DashboardPayload,
    pub last_poll_at: DateTime<Utc>,
    pub next_poll_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(payload: DashboardPayload, polled_at: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            payload,
            last_poll_at: polled_at,
            next_poll_at: polled_at + interval,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_poll_at
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        age_display(self.age(now))
    }

    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        hours_one_decimal(self.age(now))
    }

    /// Due for a new poll once `interval` has passed since the last one.
    pub fn is_stale(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        self.age(now) >= interval
    }
}

/// The single JSON cache file.
///
/// Writes go to a sibling temp file which is synced and renamed over the
/// target, so readers see either the previous record or the new one.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "dashboard_data.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load the record. Missing file is `Ok(None)`; unreadable or
    /// unparseable content is an error.
    pub fn load(&self) -> Result<Option<CacheRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache file: {}", self.path.display()))?;

        let record: CacheRecord = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", self.path.display()))?;

        if record.version != CACHE_FORMAT_VERSION {
            warn!(found = record.version, expected = CACHE_FORMAT_VERSION, "Ignoring cache with unknown format version");
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Load the record, treating a corrupt file as "no data yet".
    pub fn load_or_empty(&self) -> Option<CacheRecord> {
        match self.load() {
            Ok(Some(record)) => {
                info!(path = %self.path.display(), last_poll = %record.last_poll_at, "Loaded cached data");
                Some(record)
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No existing cache found");
                None
            }
            Err(e) => {
                warn!(error = %e, "Cache unusable, starting without data");
                None
            }
        }
    }

    /// Replace the cache file with `record`.
    pub fn save(&self, record: &CacheRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory: {}", parent.display())
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(record)?;
        let temp_path = self.temp_path();

        {
            let mut temp_file = fs::File::create(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
            temp_file
                .write_all(contents.as_bytes())
                .context("Failed to write temp cache file")?;
            temp_file.sync_all().context("Failed to sync temp cache file")?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).with_context(|| {
                format!("Failed to move cache into place: {}", self.path.display())
            });
        }

        debug!(path = %self.path.display(), bytes = contents.len(), "Saved cache");
        Ok(())
    }

    /// Delete the cache file and any leftover temp file. Returns whether a
    /// cache file existed.
    pub fn clear(&self) -> Result<bool> {
        let _ = fs::remove_file(self.temp_path());
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to delete cache file: {}", self.path.display()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn size_on_disk(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StandingEntry, Standings};
    use chrono::TimeZone;

    fn record(points: f64, polled_at: DateTime<Utc>) -> CacheRecord {
        let standings = Standings {
            drivers: vec![StandingEntry {
                rank: 1,
                name: "Oscar Piastri".to_string(),
                points,
                team: Some("McLaren".to_string()),
            }],
            constructors: vec![],
        };
        let payload = DashboardPayload::new(None, None, standings, polled_at);
        CacheRecord::new(payload, polled_at, Duration::hours(12))
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("dashboard_data.json"));
        assert!(store.load().unwrap().is_none());
        assert!(store.load_or_empty().is_none());
        assert!(store.size_on_disk().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested").join("dashboard_data.json"));
        let rec = record(99.0, noon());

        store.save(&rec).unwrap();
        assert_eq!(store.load().unwrap(), Some(rec.clone()));
        assert_eq!(rec.next_poll_at, noon() + Duration::hours(12));
        assert!(!store.temp_path().exists());
        assert!(store.size_on_disk().unwrap() > 0);
    }

    #[test]
    fn test_corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard_data.json");
        fs::write(&path, "{\"version\": 1, \"payload\": {").unwrap();
        let store = CacheStore::new(&path);
        assert!(store.load().is_err());
        assert!(store.load_or_empty().is_none());
    }

    #[test]
    fn test_unknown_version_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("dashboard_data.json"));
        let mut rec = record(99.0, noon());
        rec.version = CACHE_FORMAT_VERSION + 1;
        store.save(&rec).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_abandoned_temp_file_does_not_affect_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("dashboard_data.json"));
        let rec = record(99.0, noon());
        store.save(&rec).unwrap();

        // A write interrupted before the rename leaves only the temp file behind
        fs::write(store.temp_path(), "{\"version\": 1, \"pay").unwrap();
        assert_eq!(store.load().unwrap(), Some(rec));

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&raw).is_ok());
    }

    #[test]
    fn test_overwrite_replaces_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("dashboard_data.json"));
        store.save(&record(99.0, noon())).unwrap();
        let newer = record(124.0, noon() + Duration::hours(12));
        store.save(&newer).unwrap();
        assert_eq!(store.load().unwrap(), Some(newer));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("dashboard_data.json"));
        assert!(!store.clear().unwrap());
        store.save(&record(99.0, noon())).unwrap();
        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_record_staleness_and_age() {
        let rec = record(99.0, noon());
        let later = noon() + Duration::minutes(90);
        assert!(!rec.is_stale(later, Duration::hours(12)));
        assert!(rec.is_stale(noon() + Duration::hours(12), Duration::hours(12)));
        assert_eq!(rec.age_hours(later), 1.5);
        assert_eq!(rec.age_display(later), "2h ago");
    }
}
