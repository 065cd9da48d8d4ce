//! Flat-file JSON cache for memoizing API lookups between runs.
//!
//! This module provides:
//! - `CacheStore`: read / write / read-through access to JSON values
//! - `CacheStorage`: the backend seam, with file and in-memory implementations
//! - `build_key`: `<id>-<category>` key construction

mod error;
mod key;
mod storage;
mod store;

pub use error::CacheError;
pub use key::build_key;
pub use storage::{CacheStorage, FileStorage, MemoryStorage};
pub use store::CacheStore;
