//! Error types raised by the cache store.

use thiserror::Error;

/// Failure modes of the cache store.
///
/// The store never substitutes a default on failure and never retries.
#[derive(Debug, Error)]
pub enum CacheError {
  /// The backing entry could not be read or written (missing directory,
  /// permissions, poisoned in-memory lock).
  #[error("cache storage failed for key `{key}`: {source}")]
  Storage {
    key: String,
    #[source]
    source: std::io::Error,
  },

  /// The entry exists but does not hold valid JSON of the requested shape.
  #[error("cache entry `{key}` is malformed: {source}")]
  Malformed {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  /// The value handed to the store cannot be represented as JSON.
  #[error("value for cache key `{key}` cannot be serialized: {source}")]
  Serialization {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}
