//! Cache storage trait and its file and in-memory implementations.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use super::error::CacheError;

/// Trait for cache storage backends.
///
/// Backends move raw JSON text; serialization happens in the store.
pub trait CacheStorage: Send + Sync {
  /// Load the contents stored under `key`, or `None` if there is no entry.
  fn load(&self, key: &str) -> Result<Option<String>, CacheError>;

  /// Store `contents` under `key`, replacing anything already there.
  fn save(&self, key: &str, contents: &str) -> Result<(), CacheError>;
}

/// One `<key>.json` file per entry inside a directory.
///
/// The directory is never created here: saving into a missing directory is a
/// storage error. Writes are not atomic, so a process killed mid-write can
/// leave a truncated entry behind, which later reads report as malformed.
#[derive(Debug, Clone)]
pub struct FileStorage {
  dir: PathBuf,
}

impl FileStorage {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Path of the file backing `key`.
  pub fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }
}

impl CacheStorage for FileStorage {
  fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
    match std::fs::read_to_string(self.path_for(key)) {
      Ok(contents) => Ok(Some(contents)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(CacheError::Storage {
        key: key.to_string(),
        source,
      }),
    }
  }

  fn save(&self, key: &str, contents: &str) -> Result<(), CacheError> {
    std::fs::write(self.path_for(key), contents).map_err(|source| CacheError::Storage {
      key: key.to_string(),
      source,
    })
  }
}

/// Process-local storage, used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self, key: &str) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CacheError> {
    self.entries.lock().map_err(|e| CacheError::Storage {
      key: key.to_string(),
      source: io::Error::other(format!("Lock poisoned: {}", e)),
    })
  }
}

impl CacheStorage for MemoryStorage {
  fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
    Ok(self.lock(key)?.get(key).cloned())
  }

  fn save(&self, key: &str, contents: &str) -> Result<(), CacheError> {
    self.lock(key)?.insert(key.to_string(), contents.to_string());
    Ok(())
  }
}
