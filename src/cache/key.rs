//! Cache key construction.

use std::fmt::Display;

/// Build the cache key for one category of data about an entity, e.g. `42-uptime`.
///
/// Ids and categories of any `Display` type are accepted, so numeric site ids
/// and string ids produce the same key.
pub fn build_key(id: impl Display, category: impl Display) -> String {
  format!("{}-{}", id, category)
}
