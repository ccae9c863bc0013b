//! Persistent image verdict cache: `url -> reachable`.
//!
//! Loaded once at the start of a run, mutated only by the validation driver,
//! and written back once at the end. A missing file is the normal first-run
//! state.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default file name inside the data directory.
pub const CACHE_FILE_NAME: &str = "image_cache.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCache {
    entries: IndexMap<String, bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache from `path`. A missing file yields an empty cache; a
    /// file that does not parse is logged and ignored so the next save
    /// replaces it.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no image cache yet; starting empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read image cache {}", path.display()))
            }
        };
        match serde_json::from_slice::<IndexMap<String, bool>>(&raw) {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "image cache loaded");
                Ok(Self { entries })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "image cache unreadable; starting empty");
                Ok(Self::default())
            }
        }
    }

    pub fn get(&self, url: &str) -> Option<bool> {
        self.entries.get(url).copied()
    }

    pub fn record(&mut self, url: impl Into<String>, valid: bool) {
        self.entries.insert(url.into(), valid);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let valid = self.entries.values().filter(|v| **v).count();
        CacheStats {
            total: self.entries.len(),
            valid,
            invalid: self.entries.len() - valid,
        }
    }

    /// Write the full mapping to `path` with keys sorted.
    ///
    /// The JSON goes to a sibling temp file that is synced and then renamed
    /// over `path`, so readers only ever see the old or the new file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut sorted = self.entries.clone();
        sorted.sort_keys();
        let encoded = serde_json::to_vec_pretty(&sorted)?;

        let temp_path = temp_path_for(path);
        let mut file = File::create(&temp_path)
            .with_context(|| format!("failed to create {}", temp_path.display()))?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, path).with_context(|| {
            format!(
                "failed to move {} into place at {}",
                temp_path.display(),
                path.display()
            )
        })?;
        debug!(path = %path.display(), entries = sorted.len(), "image cache saved");
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| CACHE_FILE_NAME.into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::load(&dir.path().join("nope.json")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CACHE_FILE_NAME);

        let mut cache = ImageCache::new();
        cache.record("https://cdn.example.com/b.jpg", false);
        cache.record("https://cdn.example.com/a.jpg", true);
        cache.save(&path).unwrap();

        let loaded = ImageCache::load(&path).unwrap();
        assert_eq!(loaded.get("https://cdn.example.com/a.jpg"), Some(true));
        assert_eq!(loaded.get("https://cdn.example.com/b.jpg"), Some(false));
        assert_eq!(loaded.len(), 2);
        assert!(!dir.path().join("nested").join("image_cache.json.tmp").exists());
    }

    #[test]
    fn save_writes_flat_sorted_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        let mut cache = ImageCache::new();
        cache.record("z", true);
        cache.record("a", false);
        cache.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.find("\"a\"").unwrap() < text.find("\"z\"").unwrap());
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({"a": false, "z": true}));
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        let mut cache = ImageCache::new();
        cache.record("one", true);
        cache.save(&path).unwrap();

        let mut next = ImageCache::load(&path).unwrap();
        next.record("two", false);
        next.save(&path).unwrap();

        let loaded = ImageCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("one"), Some(true));
        assert_eq!(loaded.get("two"), Some(false));
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        fs::write(&path, b"{not json").unwrap();
        assert!(ImageCache::load(&path).unwrap().is_empty());
    }

    #[test]
    fn stats_split_valid_and_invalid() {
        let mut cache = ImageCache::new();
        cache.record("a", true);
        cache.record("b", true);
        cache.record("c", false);
        assert_eq!(
            cache.stats(),
            CacheStats {
                total: 3,
                valid: 2,
                invalid: 1
            }
        );
    }
}
