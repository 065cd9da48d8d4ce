//! Oh Dear API access: HTTP client, resource types and API vocabulary.

pub mod client;
pub mod template;
pub mod types;

pub use client::{ApiResponse, OhDearClient};
