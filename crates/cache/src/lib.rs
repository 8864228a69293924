//! Persisted title→result cache.
//!
//! One JSON object mapping the lowercased raw title to its resolution
//! outcome. An entry whose `resolved` is `null` is the explicit
//! absent-marker: the title was looked up and nothing was found. A missing
//! key means the title was never attempted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use medialog_core::types::ResolvedMedia;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One persisted resolution outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// `None` marks a title that was attempted and confirmed absent.
    pub resolved: Option<ResolvedMedia>,
    pub written_at: DateTime<Utc>,
}

/// In-memory map of resolution outcomes, persisted as a flat JSON file.
///
/// Entries are append-only within a run; `insert` only overwrites when the
/// caller explicitly forces re-resolution of a title.
pub struct CoverCache {
    path: Option<PathBuf>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CoverCache {
    /// Cache with no backing file; `flush` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Open a cache backed by `path`, loading any existing file.
    ///
    /// An unreadable or malformed file degrades to an empty in-memory map;
    /// the next successful flush rewrites the file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load(&path) {
            Ok(map) => {
                debug!(path = %path.display(), entries = map.len(), "cover cache loaded");
                map
            }
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cover cache unreadable, starting empty");
                HashMap::new()
            }
        };
        Self {
            path: Some(path),
            entries: RwLock::new(entries),
        }
    }

    /// Cache key for a raw title.
    ///
    /// Always derived from the unmodified raw title, never from a search
    /// variant, so all variants tried for one title collapse to one row.
    pub fn key(raw_title: &str) -> String {
        raw_title.trim().to_lowercase()
    }

    pub fn get(&self, raw_title: &str) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Self::key(raw_title))
            .cloned()
    }

    /// Record an outcome for a title; `None` records a confirmed absence.
    pub fn insert(&self, raw_title: &str, resolved: Option<ResolvedMedia>) {
        let entry = CacheEntry {
            resolved,
            written_at: Utc::now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(raw_title), entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the full map to the backing file.
    ///
    /// A failed flush leaves the in-memory state intact; the caller retries
    /// at its next flush point.
    pub fn flush(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), entries = snapshot.len(), "cover cache flushed");
        Ok(())
    }
}

fn load(path: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medialog_core::types::MediaMetadata;

    fn sample() -> ResolvedMedia {
        ResolvedMedia {
            cover_url: Some("https://images.example/cover.jpg".into()),
            metadata: Some(MediaMetadata {
                year: Some(2015),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn keys_are_lowercased_raw_titles() {
        assert_eq!(CoverCache::key("  The Witcher 3 "), "the witcher 3");
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covers.json");

        let cache = CoverCache::open(&path);
        cache.insert("The Witcher 3", Some(sample()));
        cache.insert("Some Obscure Game", None);
        cache.flush().unwrap();

        let reloaded = CoverCache::open(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get("the witcher 3").unwrap().resolved,
            Some(sample())
        );
        // Absent-marker survives and stays distinct from a missing key.
        let absent = reloaded.get("Some Obscure Game").unwrap();
        assert_eq!(absent.resolved, None);
        assert!(reloaded.get("never attempted").is_none());
    }

    #[test]
    fn malformed_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("covers.json");
        std::fs::write(&path, "not json at all").unwrap();

        let cache = CoverCache::open(&path);
        assert!(cache.is_empty());
        // A flush afterwards repairs the file.
        cache.insert("Dune", None);
        cache.flush().unwrap();
        assert_eq!(CoverCache::open(&path).len(), 1);
    }

    #[test]
    fn in_memory_flush_is_noop() {
        let cache = CoverCache::in_memory();
        cache.insert("Dune", Some(sample()));
        cache.flush().unwrap();
        assert_eq!(cache.get("dune").unwrap().resolved, Some(sample()));
    }
}
