//! Serde types matching the Oh Dear API resources the tasks work with.
//!
//! Only the fields the tasks read are typed; everything else is kept in
//! `extra` so a resource can be inspected or echoed back without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::template::{CheckResult, SummarizedCheckResult};

/// Envelope used by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
  pub data: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
  pub id: u64,
  pub url: String,
  #[serde(default)]
  pub label: Option<String>,
  #[serde(default)]
  pub team_id: Option<u64>,
  #[serde(default)]
  pub summarized_check_result: Option<SummarizedCheckResult>,
  #[serde(default)]
  pub checks: Vec<Check>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Site {
  /// Types of the checks currently enabled on the site, in API order.
  pub fn enabled_check_types(&self) -> Vec<String> {
    self
      .checks
      .iter()
      .filter(|check| check.enabled)
      .map(|check| check.check_type.clone())
      .collect()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
  pub id: u64,
  /// Wire name of the check type; kept as text so new check types don't break decoding
  #[serde(rename = "type")]
  pub check_type: String,
  #[serde(default)]
  pub enabled: bool,
  #[serde(default)]
  pub latest_run_result: Option<CheckResult>,
  #[serde(default)]
  pub settings: Option<Map<String, Value>>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
  pub id: u64,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub team_id: Option<u64>,
}

/// Notification destination attached to a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagNotificationDestination {
  pub id: u64,
  pub channel: String,
  #[serde(default)]
  pub destination: Map<String, Value>,
  pub tag: Tag,
}

/// Notification destination attached to a site or a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDestination {
  pub id: u64,
  #[serde(default)]
  pub label: Option<String>,
  pub channel: String,
  #[serde(default)]
  pub destination: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPage {
  pub id: u64,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}
