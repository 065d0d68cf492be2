use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;

/// Seen entries older than this are forgotten on load (30 days).
pub const SEEN_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

/// Set of canonical article ids already notified.
pub type SeenSet = HashSet<String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write seen-articles file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize seen articles: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Capability: persistence for the seen set.
///
/// `load` never fails; unreadable state degrades to an empty set, since
/// re-notifying an article is preferable to aborting the run.
pub trait SeenStore: Send + Sync {
    fn load(&self) -> SeenSet;

    /// Replace the persisted set with `seen`, stamping every member with "now".
    fn save(&self, seen: &SeenSet) -> Result<(), StoreError>;
}

// ============================================================================
// JSON file store
// ============================================================================

/// Flat JSON file mapping canonical id → epoch seconds.
///
/// ```json
/// { "https://news.xbox.com/en-us/2025/09/04/silksong/": 1757000000 }
/// ```
#[derive(Debug, Clone)]
pub struct JsonSeenStore {
    path: PathBuf,
}

impl JsonSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ids whose timestamp lies within the window ending at `now`.
    ///
    /// - Missing file → empty set
    /// - Corrupt JSON → logged, empty set
    /// - Legacy list format (ids without timestamps) → logged, empty set
    /// - Entries with non-numeric timestamps are ignored
    pub fn load_at(&self, now: i64) -> SeenSet {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No seen-articles file, starting empty");
                return SeenSet::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read seen-articles file, starting empty");
                return SeenSet::new();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Corrupt seen-articles file, starting empty");
                return SeenSet::new();
            }
        };

        let map = match value {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Array(items) => {
                tracing::warn!(
                    path = %self.path.display(),
                    entries = items.len(),
                    "Seen-articles file uses legacy list format without timestamps, starting empty"
                );
                return SeenSet::new();
            }
            _ => {
                tracing::warn!(path = %self.path.display(), "Unexpected seen-articles file shape, starting empty");
                return SeenSet::new();
            }
        };

        let cutoff = now.saturating_sub(SEEN_WINDOW_SECS);
        let total = map.len();
        let seen: SeenSet = map
            .into_iter()
            .filter_map(|(id, ts)| {
                let ts = ts.as_i64().or_else(|| ts.as_f64().map(|f| f as i64))?;
                (ts >= cutoff).then_some(id)
            })
            .collect();

        tracing::info!(
            path = %self.path.display(),
            active = seen.len(),
            dropped = total - seen.len(),
            "Loaded seen articles"
        );
        seen
    }

    /// Overwrite the file with every id in `seen` stamped with `now`.
    ///
    /// Writes to a temporary sibling file and renames it over the target so a
    /// crash mid-write never leaves a truncated file behind.
    pub fn save_at(&self, seen: &SeenSet, now: i64) -> Result<(), StoreError> {
        let stamped: BTreeMap<&str, i64> = seen.iter().map(|id| (id.as_str(), now)).collect();
        let json = serde_json::to_vec_pretty(&stamped)?;

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let temp_path = self.path.with_extension(format!("tmp.{}", std::process::id()));
        let write_result = (|| {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
            drop(file);
            std::fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = write_result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(io_err(e));
        }

        tracing::info!(path = %self.path.display(), count = seen.len(), "Saved seen articles");
        Ok(())
    }
}

impl SeenStore for JsonSeenStore {
    fn load(&self) -> SeenSet {
        self.load_at(Utc::now().timestamp())
    }

    fn save(&self, seen: &SeenSet) -> Result<(), StoreError> {
        self.save_at(seen, Utc::now().timestamp())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store kept in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    seen: SeenSet,
    saves: usize,
}

impl MemorySeenStore {
    pub fn new(initial: SeenSet) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                seen: initial,
                saves: 0,
            }),
        }
    }

    /// Current persisted contents.
    pub fn snapshot(&self) -> SeenSet {
        self.lock().seen.clone()
    }

    /// Number of times `save` has been called.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SeenStore for MemorySeenStore {
    fn load(&self) -> SeenSet {
        self.lock().seen.clone()
    }

    fn save(&self, seen: &SeenSet) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.seen = seen.clone();
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_760_000_000;

    fn temp_store(name: &str) -> (PathBuf, JsonSeenStore) {
        let dir = std::env::temp_dir().join(format!("passwatch_seen_test_{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        let store = JsonSeenStore::new(dir.join("seen_articles.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (dir, store) = temp_store("missing");
        assert!(store.load_at(NOW).is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_expired_entries_excluded() {
        let (dir, store) = temp_store("expiry");
        let content = serde_json::json!({
            "https://news.example.com/fresh": NOW - 60,
            "https://news.example.com/edge": NOW - SEEN_WINDOW_SECS,
            "https://news.example.com/stale": NOW - SEEN_WINDOW_SECS - 1,
        });
        std::fs::write(store.path(), content.to_string()).unwrap();

        let seen = store.load_at(NOW);
        let expected: SeenSet = [
            "https://news.example.com/fresh".to_string(),
            "https://news.example.com/edge".to_string(),
        ]
        .into_iter()
        .collect();
        assert_eq!(seen, expected);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_legacy_list_format_treated_as_empty() {
        let (dir, store) = temp_store("legacy");
        std::fs::write(store.path(), r#"["https://news.xbox.com/a", "https://news.xbox.com/b"]"#)
            .unwrap();
        assert!(store.load_at(NOW).is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let (dir, store) = temp_store("corrupt");
        std::fs::write(store.path(), "{\"https://a\": 17").unwrap();
        assert!(store.load_at(NOW).is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_non_numeric_timestamps_ignored() {
        let (dir, store) = temp_store("non_numeric");
        std::fs::write(
            store.path(),
            format!(r#"{{"https://a/": "yesterday", "https://b/": {}}}"#, NOW),
        )
        .unwrap();
        let seen = store.load_at(NOW);
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("https://b/"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_stamps_every_member_with_now() {
        let (dir, store) = temp_store("save");
        let seen: SeenSet = ["https://a/".to_string(), "https://b/".to_string()]
            .into_iter()
            .collect();
        store.save_at(&seen, NOW).unwrap();

        let raw: BTreeMap<String, i64> =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert!(raw.values().all(|ts| *ts == NOW));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_overwrites_and_drops_expired() {
        let (dir, store) = temp_store("overwrite");
        let content = serde_json::json!({
            "https://old/": NOW - SEEN_WINDOW_SECS - 10,
            "https://kept/": NOW - 100,
        });
        std::fs::write(store.path(), content.to_string()).unwrap();

        let seen = store.load_at(NOW);
        store.save_at(&seen, NOW).unwrap();

        let raw: BTreeMap<String, i64> =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw.keys().collect::<Vec<_>>(), vec!["https://kept/"]);
        assert_eq!(raw["https://kept/"], NOW);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_refreshes_ttl() {
        let (dir, store) = temp_store("refresh");
        let seen: SeenSet = ["https://a/".to_string()].into_iter().collect();
        store.save_at(&seen, NOW - SEEN_WINDOW_SECS + 5).unwrap();

        // Re-saving at NOW restarts the 30-day clock
        let loaded = store.load_at(NOW);
        store.save_at(&loaded, NOW).unwrap();
        assert!(store.load_at(NOW + SEEN_WINDOW_SECS - 1).contains("https://a/"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let (dir, _) = temp_store("nested");
        let store = JsonSeenStore::new(dir.join("state").join("seen.json"));
        store.save_at(&SeenSet::new(), NOW).unwrap();
        assert!(store.path().exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemorySeenStore::default();
        let seen: SeenSet = ["x".to_string()].into_iter().collect();
        store.save(&seen).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load(), seen);
    }
}
