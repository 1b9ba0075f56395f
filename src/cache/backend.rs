//! Durable Cache Backend
//!
//! Pluggable persistence behind the TTL cache. The in-memory map is always
//! the primary store; a backend mirrors writes to durable storage and is
//! replayed on construction. Backend failures are logged and swallowed so a
//! broken disk degrades the cache to memory-only instead of breaking
//! callers.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

// == Persisted Entry ==
/// The serialized envelope written for each durable entry.
///
/// `key` is carried inside the envelope because file names are hashed and
/// cannot be reversed into keys on hydration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEntry {
    /// The cache key this envelope belongs to
    pub key: String,
    /// The stored payload
    pub value: Value,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

// == Cache Backend Trait ==
/// A durable key-value store mirroring cache writes.
///
/// Implementations never propagate storage failures: they log and return,
/// leaving the in-memory cache authoritative.
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Loads every readable persisted entry. Corrupt entries are skipped.
    fn hydrate(&self) -> Vec<PersistedEntry>;

    /// Writes one entry to durable storage.
    fn persist(&self, entry: &PersistedEntry);

    /// Removes one entry from durable storage; no-op when absent.
    fn remove(&self, key: &str);

    /// Removes every persisted entry.
    fn clear(&self);
}

// == File Backend ==
/// File-per-entry durable store: each entry lives in `<dir>/<sha256>.json`.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Creates a file backend rooted at `dir`, creating the directory if
    /// needed. A directory that cannot be created is reported but the
    /// backend still constructs; subsequent writes will log and degrade.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "Failed to create cache directory; persistence disabled");
        }
        Self { dir }
    }

    /// Path of the envelope file for a key.
    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

impl CacheBackend for FileBackend {
    fn hydrate(&self) -> Vec<PersistedEntry> {
        let mut entries = Vec::new();

        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to read cache directory");
                return entries;
            }
        };

        for item in dir.flatten() {
            let path = item.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read cache file");
                    continue;
                }
            };

            match serde_json::from_slice::<PersistedEntry>(&bytes) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    // Corrupt envelope: drop the file so it is not re-read forever
                    warn!(path = %path.display(), error = %e, "Discarding corrupt cache file");
                    let _ = fs::remove_file(&path);
                }
            }
        }

        debug!(count = entries.len(), dir = %self.dir.display(), "Hydrated cache entries");
        entries
    }

    fn persist(&self, entry: &PersistedEntry) {
        let path = self.path_for(&entry.key);
        let payload = match serde_json::to_vec(entry) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %entry.key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = fs::write(&path, payload) {
            warn!(path = %path.display(), error = %e, "Failed to persist cache entry");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove cache file");
            }
        }
    }

    fn clear(&self) {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(_) => return,
        };

        for item in dir.flatten() {
            let path = item.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                }
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("certman_backend_test_{}", uuid::Uuid::new_v4()))
    }

    fn entry(key: &str, value: Value) -> PersistedEntry {
        PersistedEntry {
            key: key.to_string(),
            value,
            created_at: 1_000,
            expires_at: u64::MAX,
        }
    }

    #[test]
    fn test_persist_and_hydrate() {
        let dir = temp_dir();
        let backend = FileBackend::new(&dir);

        backend.persist(&entry("/certificates?page=1", json!({"total": 3})));
        backend.persist(&entry("/servers", json!([1, 2])));

        let hydrated = backend.hydrate();
        assert_eq!(hydrated.len(), 2);
        assert!(hydrated.iter().any(|e| e.key == "/servers"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_persisted_envelope_format() {
        let e = entry("/alerts", json!(null));
        let text = serde_json::to_string(&e).unwrap();
        assert!(text.contains("\"createdAt\""));
        assert!(text.contains("\"expiresAt\""));
        assert!(text.contains("\"value\""));
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = temp_dir();
        let backend = FileBackend::new(&dir);

        backend.persist(&entry("a", json!(1)));
        backend.persist(&entry("b", json!(2)));

        backend.remove("a");
        assert_eq!(backend.hydrate().len(), 1);

        // Removing an absent key is a no-op
        backend.remove("ghost");

        backend.clear();
        assert!(backend.hydrate().is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_file_skipped_and_discarded() {
        let dir = temp_dir();
        let backend = FileBackend::new(&dir);

        backend.persist(&entry("good", json!(true)));
        fs::write(dir.join("garbage.json"), b"{not json").unwrap();

        let hydrated = backend.hydrate();
        assert_eq!(hydrated.len(), 1);
        assert_eq!(hydrated[0].key, "good");
        assert!(!dir.join("garbage.json").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unwritable_directory_degrades_silently() {
        // Point the backend at a path that is a file, so every write fails
        let bogus = std::env::temp_dir().join(format!("certman_flat_{}", uuid::Uuid::new_v4()));
        fs::write(&bogus, b"occupied").unwrap();

        let backend = FileBackend::new(&bogus);
        backend.persist(&entry("k", json!(1)));
        backend.remove("k");
        backend.clear();
        assert!(backend.hydrate().is_empty());

        fs::remove_file(&bogus).unwrap();
    }
}
