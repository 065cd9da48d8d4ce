//! Read-through JSON cache used to memoize remote lookups across runs.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::error::CacheError;
use super::storage::{CacheStorage, FileStorage};

/// JSON value cache over a pluggable storage backend.
///
/// There is no expiry and no locking. Two callers racing on the same absent
/// key both compute and the last write wins.
pub struct CacheStore<S: CacheStorage = FileStorage> {
  storage: Arc<S>,
}

impl<S: CacheStorage> CacheStore<S> {
  /// Create a new cache store with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
    }
  }

  /// Read the entry for `key`.
  ///
  /// `Ok(None)` means there is no entry at all; an entry holding JSON `null`
  /// reads back as `Some` of a null value.
  pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
    let Some(contents) = self.storage.load(key)? else {
      debug!(key, "cache miss");
      return Ok(None);
    };

    let value = serde_json::from_str(&contents).map_err(|source| CacheError::Malformed {
      key: key.to_string(),
      source,
    })?;

    debug!(key, "cache hit");
    Ok(Some(value))
  }

  /// Persist `value` as pretty-printed JSON under `key`, returning it back.
  pub fn write<T: Serialize>(&self, key: &str, value: T) -> Result<T, CacheError> {
    let contents =
      serde_json::to_string_pretty(&value).map_err(|source| CacheError::Serialization {
        key: key.to_string(),
        source,
      })?;

    self.storage.save(key, &contents)?;
    debug!(key, bytes = contents.len(), "cache write");

    Ok(value)
  }

  /// Await a pending computation and persist what it resolves to.
  ///
  /// Errors from the computation are returned untouched and nothing is written.
  pub async fn write_pending<T, E, Fut>(&self, key: &str, pending: Fut) -> Result<T, E>
  where
    T: Serialize,
    Fut: Future<Output = Result<T, E>>,
    E: From<CacheError>,
  {
    let value = pending.await?;
    Ok(self.write(key, value)?)
  }

  /// Return the cached value for `key`, computing and persisting it on a miss.
  ///
  /// Any existing entry is a hit, including one that holds JSON `null`.
  pub async fn get_or_compute<T, E, F, Fut>(&self, key: &str, supplier: F) -> Result<T, E>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<CacheError>,
  {
    if let Some(cached) = self.read(key)? {
      return Ok(cached);
    }

    self.write_pending(key, supplier()).await
  }
}

impl<S: CacheStorage> Clone for CacheStore<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}
