//! Document store adapter: the whole game state lives in one JSON document
//! that is read at startup and overwritten on every save. The engine is the
//! only writer; an exclusive file lock keeps a second bot process from
//! sharing the same document.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::warn;

use crate::rpg::errors::StoreError;
use crate::rpg::types::RpgDocument;

/// Persistence contract the engine relies on. `read` loads the full document
/// (yielding a default empty structure when absent or corrupt) and `write`
/// replaces the stored copy wholesale. No partial writes, no transactions;
/// the engine serializes all mutations through one in-memory document.
pub trait DocumentStore: Send {
    fn read(&mut self) -> Result<RpgDocument, StoreError>;
    fn write(&mut self, doc: &RpgDocument) -> Result<(), StoreError>;
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct JsonFileStoreBuilder {
    path: PathBuf,
    lock: bool,
}

impl JsonFileStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: true,
        }
    }

    /// Opt out of the exclusive file lock (useful when a test opens the same
    /// document twice on purpose).
    pub fn without_lock(mut self) -> Self {
        self.lock = false;
        self
    }

    pub fn open(self) -> Result<JsonFileStore, StoreError> {
        JsonFileStore::open_with_options(self.path, self.lock)
    }
}

/// JSON-file-backed document store. Writes go to a sibling temp file first
/// and are renamed into place so a crash mid-write never truncates the
/// document.
pub struct JsonFileStore {
    path: PathBuf,
    _lock: Option<File>,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_options(path.as_ref().to_path_buf(), true)
    }

    fn open_with_options(path: PathBuf, lock: bool) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let lock_file = if lock {
            let lock_path = path.with_extension("lock");
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&lock_path)?;
            file.try_lock_exclusive()
                .map_err(|_| StoreError::Locked(lock_path.display().to_string()))?;
            Some(file)
        } else {
            None
        };
        Ok(Self {
            path,
            _lock: lock_file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonFileStore {
    fn read(&mut self) -> Result<RpgDocument, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RpgDocument::default());
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                // A corrupt document is replaced with a fresh one rather than
                // refusing to start; the corrupt copy stays on disk until the
                // next write.
                warn!(
                    "game document {} is corrupt ({}); starting empty",
                    self.path.display(),
                    e
                );
                Ok(RpgDocument::default())
            }
        }
    }

    fn write(&mut self, doc: &RpgDocument) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store for unit tests. `fail_next_writes` makes the next N
/// writes error so persistence retry behavior can be exercised.
#[derive(Default)]
pub struct MemoryStore {
    doc: RpgDocument,
    pub fail_next_writes: u32,
    pub write_count: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn read(&mut self) -> Result<RpgDocument, StoreError> {
        Ok(self.doc.clone())
    }

    fn write(&mut self, doc: &RpgDocument) -> Result<(), StoreError> {
        self.write_count += 1;
        if self.fail_next_writes > 0 {
            self.fail_next_writes -= 1;
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated write failure",
            )));
        }
        self.doc = doc.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpg::types::{GuildRecord, DOCUMENT_SCHEMA_VERSION};
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_default() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = JsonFileStoreBuilder::new(dir.path().join("game.json"))
            .open()
            .expect("store");
        let doc = store.read().expect("read");
        assert_eq!(doc, RpgDocument::default());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = JsonFileStoreBuilder::new(dir.path().join("game.json"))
            .open()
            .expect("store");
        let mut doc = RpgDocument::default();
        doc.guilds.push(GuildRecord::new("Nightwatch", "alice"));
        store.write(&doc).expect("write");
        let loaded = store.read().expect("read");
        assert_eq!(loaded.guilds.len(), 1);
        assert_eq!(loaded.guilds[0].name, "Nightwatch");
        assert_eq!(loaded.schema_version, DOCUMENT_SCHEMA_VERSION);
    }

    #[test]
    fn corrupt_file_reads_as_default() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("game.json");
        std::fs::write(&path, "{ this is not json").expect("write garbage");
        let mut store = JsonFileStoreBuilder::new(&path).open().expect("store");
        let doc = store.read().expect("read");
        assert_eq!(doc, RpgDocument::default());
    }

    #[test]
    fn second_open_fails_while_locked() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("game.json");
        let _store = JsonFileStoreBuilder::new(&path).open().expect("store");
        let second = JsonFileStoreBuilder::new(&path).open();
        assert!(matches!(second, Err(StoreError::Locked(_))));
    }

    #[test]
    fn memory_store_simulates_failures() {
        let mut store = MemoryStore::new();
        store.fail_next_writes = 1;
        let doc = RpgDocument::default();
        assert!(store.write(&doc).is_err());
        assert!(store.write(&doc).is_ok());
        assert_eq!(store.write_count, 2);
    }
}
