use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::ohdear::template::CheckType;

pub const DEFAULT_API_URL: &str = "https://ohdear.app/api/";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  /// Directory holding `<key>.json` cache entries
  pub cache_dir: PathBuf,
  /// Team used by tasks when none is given on the command line
  pub team_id: Option<u64>,
  /// Sites `create-sites` should make sure exist
  pub sites: Vec<SiteDefinition>,
  /// Tag notification destinations `migrate-notifications` should create
  pub tag_notifications: Vec<TagNotificationTemplate>,
  pub status_page_domain: Option<String>,
  /// Label of the team notification destination used as a template
  pub notification_template_label: String,
  pub log: LogConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      cache_dir: PathBuf::from("cache"),
      team_id: None,
      sites: Vec::new(),
      tag_notifications: Vec::new(),
      status_page_domain: None,
      notification_template_label: "slack-template".to_string(),
      log: LogConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_API_URL.to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Filter directive used when OHDEAR_LOG is not set (e.g. "debug")
  pub level: Option<String>,
  /// Also write logs to this file
  pub file: Option<PathBuf>,
}

/// A site that should exist in the team.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteDefinition {
  pub url: String,
  pub label: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub checks: Vec<CheckType>,
}

/// A notification destination to attach to each of several tags.
#[derive(Debug, Clone, Deserialize)]
pub struct TagNotificationTemplate {
  pub tag_ids: Vec<u64>,
  pub label: String,
  pub channel: String,
  pub destination: Map<String, Value>,
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ohdear-tasks.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ohdear-tasks/config.yaml
  ///
  /// OHDEAR_API_URL overrides `api.url` wherever the rest came from.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(url) = std::env::var("OHDEAR_API_URL") {
      config.api.url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("ohdear-tasks.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ohdear-tasks").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Team id from the command line or the config file.
  pub fn team_id(&self, explicit: Option<u64>) -> Result<u64> {
    explicit
      .or(self.team_id)
      .ok_or_else(|| eyre!("No team id given. Pass --team-id or set team_id in the config file."))
  }

  /// Get the Oh Dear API token from environment variables.
  ///
  /// Checks OHDEAR_API_KEY.
  pub fn get_api_token() -> Result<String> {
    std::env::var("OHDEAR_API_KEY")
      .ok()
      .filter(|token| !token.is_empty())
      .ok_or_else(|| {
        eyre!("Oh Dear API token not found. Set the OHDEAR_API_KEY environment variable.")
      })
  }
}
