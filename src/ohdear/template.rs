//! Vocabulary of the Oh Dear API: check types, option values and the
//! site-settings template.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Checks that can be enabled on a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
  Uptime,
  Performance,
  BrokenLinks,
  MixedContent,
  Lighthouse,
  Cron,
  ApplicationHealth,
  Sitemap,
  Dns,
  Domain,
  CertificateHealth,
  CertificateTransparency,
}

impl CheckType {
  pub const ALL: [CheckType; 12] = [
    CheckType::Uptime,
    CheckType::Performance,
    CheckType::BrokenLinks,
    CheckType::MixedContent,
    CheckType::Lighthouse,
    CheckType::Cron,
    CheckType::ApplicationHealth,
    CheckType::Sitemap,
    CheckType::Dns,
    CheckType::Domain,
    CheckType::CertificateHealth,
    CheckType::CertificateTransparency,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      CheckType::Uptime => "uptime",
      CheckType::Performance => "performance",
      CheckType::BrokenLinks => "broken_links",
      CheckType::MixedContent => "mixed_content",
      CheckType::Lighthouse => "lighthouse",
      CheckType::Cron => "cron",
      CheckType::ApplicationHealth => "application_health",
      CheckType::Sitemap => "sitemap",
      CheckType::Dns => "dns",
      CheckType::Domain => "domain",
      CheckType::CertificateHealth => "certificate_health",
      CheckType::CertificateTransparency => "certificate_transparency",
    }
  }
}

impl fmt::Display for CheckType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for CheckType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    CheckType::ALL
      .into_iter()
      .find(|check| check.as_str() == s)
      .ok_or_else(|| format!("unknown check type: {}", s))
  }
}

/// Element types the broken links crawler follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
  Link,
  Image,
  Script,
  Stylesheet,
  #[serde(rename = "og:image")]
  OgImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckResult {
  Pending,
  Succeeded,
  Warning,
  Failed,
  ErroredOrTimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarizedCheckResult {
  Succeeded,
  Warning,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlerSpeed {
  Slowest,
  Slow,
  Default,
  Fast,
  Fastest,
}

/// CPU slowdown applied to lighthouse runs; serialized as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum LighthouseSpeedModifier {
  Slowest = 5,
  Slow = 4,
  Default = 3,
  Fast = 2,
  Fastest = 1,
  None = 0,
}

impl TryFrom<u8> for LighthouseSpeedModifier {
  type Error = String;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      5 => Ok(Self::Slowest),
      4 => Ok(Self::Slow),
      3 => Ok(Self::Default),
      2 => Ok(Self::Fast),
      1 => Ok(Self::Fastest),
      0 => Ok(Self::None),
      other => Err(format!("invalid lighthouse cpu slowdown modifier: {}", other)),
    }
  }
}

impl Serialize for LighthouseSpeedModifier {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(*self as u8)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LighthouseContinent {
  Europe,
  NorthAmerica,
  Asia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseHeaderCondition {
  Contains,
  NotContains,
  Equals,
  MatchesPattern,
}

/// Locations uptime checks can run from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UptimeCheckLocation {
  // Africa
  CapeTown,
  // Asia
  Bangalore,
  Seoul,
  Singapore,
  Tokyo,
  // Australia
  Sydney,
  // Canada
  Toronto,
  // Europe
  Frankfurt,
  London,
  Paris,
  // Middle East
  Bahrain,
  // South America
  SaoPaulo,
  // US
  NewYork,
  Dallas,
  LosAngeles,
  SanFrancisco,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum DnsRecordType {
  A,
  AAAA,
  CAA,
  CNAME,
  MX,
  NS,
  SOA,
  SRV,
  TXT,
  PTR,
}

/// Full site settings with every check enabled, as a starting point for new sites.
pub fn site_template() -> Value {
  json!({
    "checks": CheckType::ALL,
    "uptime_check_location": UptimeCheckLocation::London,
    "uptime_check_failed_notification_threshold": 2,
    "uptime_check_http_verb": "get",
    "uptime_check_timeout": 5,
    "uptime_check_max_redirect_count": 5,
    "uptime_check_payload": [],
    "uptime_check_valid_status_codes": ["2*"],
    "uptime_check_look_for_string": null,
    "uptime_check_absent_string": null,
    "uptime_check_expected_response_headers": [
      {
        "name": "my-response-header",
        "condition": ResponseHeaderCondition::Equals,
        "value": "my-response-value"
      }
    ],
    "http_client_headers": [
      {"name": "my-header", "value": "my-value"}
    ],
    "performance_threshold_in_ms": 3500,
    "performance_change_percentage": 50,
    "crawler_headers": [
      {"name": "my-broken-links-header", "value": "my-broken-links-value"}
    ],
    "broken_links_check_include_external_links": false,
    "broken_link_types": [
      LinkType::Link,
      LinkType::Image,
      LinkType::Script,
      LinkType::Stylesheet,
      LinkType::OgImage
    ],
    "broken_links_whitelisted_urls": [],
    "respect_robots": true,
    "sitemap_path": "/sitemap.xml",
    "sitemap_speed": CrawlerSpeed::Slow,
    "application_health_check_result_url": "https://mybrandnewsite.tld/health",
    "application_health_headers": [
      {"name": "my-header", "value": "my-value"}
    ],
    "certificate_health_check_expires_soon_threshold_in_days": 14,
    "dns_check_nameservers_in_sync": true,
    "dns_monitor_main_domain": false,
    "dns_extra_cnames": ["cname1", "cname2"],
    "dns_ignored_record_types": [DnsRecordType::A, DnsRecordType::CNAME],
    "domain_check_expires_soon_threshold_in_days": 30,
    "lighthouse_check_continent": LighthouseContinent::Europe,
    "lighthouse_cpu_slowdown_modifier": LighthouseSpeedModifier::None
  })
}
