//! Administrative workflows composed from API calls and the cache.
//!
//! Every task returns a serializable outcome; the CLI prints it as JSON.

pub mod checks;
pub mod notifications;
pub mod report;
pub mod sites;
pub mod status_pages;

use serde::Serialize;
use serde_json::Value;

/// Result of one write request against a site.
#[derive(Debug, Clone, Serialize)]
pub struct SiteOutcome {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub site_id: Option<u64>,
  pub url: String,
  pub status: u16,
  #[serde(skip_serializing_if = "Value::is_null")]
  pub message: Value,
}
