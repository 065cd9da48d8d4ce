//! Monthly report snapshots assembled from cached API lookups.
//!
//! Every section of the report is read through the cache under
//! `<site id>-<section>`, so re-running a report only hits the API for
//! sections that were never fetched. The assembled report is written to
//! `<site id>-report`.

use chrono::{Datelike, Duration, NaiveDateTime};
use color_eyre::Result;
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::info;

use crate::cache::{build_key, CacheStorage, CacheStore};
use crate::ohdear::OhDearClient;

/// Timestamp format the API expects in date filters.
const FILTER_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Reporting period: first day of the current month up to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: NaiveDateTime,
  pub end: NaiveDateTime,
}

impl DateRange {
  /// Month-to-date range ending at `now`; the start keeps `now`'s time of day.
  pub fn month_to_date(now: NaiveDateTime) -> Self {
    Self {
      start: now - Duration::days(i64::from(now.day0())),
      end: now,
    }
  }

  pub fn start_param(&self) -> String {
    self.start.format(FILTER_DATE_FORMAT).to_string()
  }

  pub fn end_param(&self) -> String {
    self.end.format(FILTER_DATE_FORMAT).to_string()
  }
}

/// Cached sections of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
  Site,
  Uptime,
  Downtime,
  Performance,
  BrokenLinks,
  MixedContent,
  CertificateHealth,
  CronDefinitions,
  Dns,
  ApplicationHealth,
  ApplicationHealthCheck(u64),
  Domain,
  Lighthouse,
  Report,
}

impl fmt::Display for Section {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Section::Site => f.write_str("site"),
      Section::Uptime => f.write_str("uptime"),
      Section::Downtime => f.write_str("downtime"),
      Section::Performance => f.write_str("performance"),
      Section::BrokenLinks => f.write_str("broken-links"),
      Section::MixedContent => f.write_str("mixed-content"),
      Section::CertificateHealth => f.write_str("certificate-health"),
      Section::CronDefinitions => f.write_str("cron-definitions"),
      Section::Dns => f.write_str("dns"),
      Section::ApplicationHealth => f.write_str("application-health"),
      Section::ApplicationHealthCheck(id) => write!(f, "application-health-check-{}", id),
      Section::Domain => f.write_str("domain"),
      Section::Lighthouse => f.write_str("lighthouse"),
      Section::Report => f.write_str("report"),
    }
  }
}

/// Snapshot of everything Oh Dear knows about a site for the period.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSnapshot {
  pub site: Value,
  pub uptime: Value,
  pub downtime: Value,
  pub performance: Value,
  pub broken_links: Value,
  pub mixed_content: Value,
  pub certificate_health: Value,
  pub cron_definitions: Value,
  pub dns: Value,
  pub application_health: Value,
  pub application_health_check_results: Vec<Value>,
  pub domain: Value,
  pub lighthouse: Value,
}

struct ReportBuilder<'a, S: CacheStorage> {
  client: &'a OhDearClient,
  cache: &'a CacheStore<S>,
  site_id: u64,
  range: DateRange,
}

impl<S: CacheStorage> ReportBuilder<'_, S> {
  async fn section(
    &self,
    section: Section,
    path: String,
    filters: &[(&str, String)],
    params: &[(&str, String)],
  ) -> Result<Value> {
    let key = build_key(self.site_id, section);
    self
      .cache
      .get_or_compute(&key, || self.client.get_json::<Value>(&path, filters, params))
      .await
  }

  fn period_filters(&self, start: &'static str, end: &'static str) -> [(&'static str, String); 2] {
    [
      (start, self.range.start_param()),
      (end, self.range.end_param()),
    ]
  }

  async fn build(&self) -> Result<ReportSnapshot> {
    let id = self.site_id;

    let site = self
      .section(Section::Site, format!("sites/{}", id), &[], &[])
      .await?;
    let uptime = self
      .section(
        Section::Uptime,
        format!("sites/{}/uptime", id),
        &self.period_filters("started_at", "ended_at"),
        &[("split", "day".to_string())],
      )
      .await?;
    let downtime = self
      .section(
        Section::Downtime,
        format!("sites/{}/downtime", id),
        &self.period_filters("started_at", "ended_at"),
        &[],
      )
      .await?;
    let [start, end] = self.period_filters("start", "end");
    let performance = self
      .section(
        Section::Performance,
        format!("sites/{}/performance-records", id),
        &[start, end, ("group_by", "day".to_string())],
        &[],
      )
      .await?;
    let broken_links = self
      .section(Section::BrokenLinks, format!("broken-links/{}", id), &[], &[])
      .await?;
    let mixed_content = self
      .section(Section::MixedContent, format!("mixed-content/{}", id), &[], &[])
      .await?;
    let certificate_health = self
      .section(
        Section::CertificateHealth,
        format!("certificate-health/{}", id),
        &[],
        &[],
      )
      .await?;
    let cron_definitions = self
      .section(
        Section::CronDefinitions,
        format!("sites/{}/cron-checks", id),
        &[],
        &[],
      )
      .await?;
    let dns = self
      .section(Section::Dns, format!("sites/{}/dns-history-items", id), &[], &[])
      .await?;
    let application_health = self
      .section(
        Section::ApplicationHealth,
        format!("sites/{}/application-health-checks", id),
        &[],
        &[],
      )
      .await?;
    let domain = self
      .section(Section::Domain, format!("sites/{}/domain", id), &[], &[])
      .await?;
    let lighthouse = self
      .section(
        Section::Lighthouse,
        format!("sites/{}/lighthouse-reports/latest", id),
        &[],
        &[],
      )
      .await?;

    let application_health_check_results =
      try_join_all(application_health_check_ids(&application_health).into_iter().map(
        |check_id| {
          self.section(
            Section::ApplicationHealthCheck(check_id),
            format!("sites/{}/application-health-checks/{}", id, check_id),
            &[],
            &[],
          )
        },
      ))
      .await?;

    Ok(ReportSnapshot {
      site,
      uptime,
      downtime: data_of(downtime),
      performance: data_of(performance),
      broken_links: data_of(broken_links),
      mixed_content: data_of(mixed_content),
      certificate_health,
      cron_definitions,
      dns: data_of(dns),
      application_health,
      application_health_check_results,
      domain,
      lighthouse,
    })
  }
}

/// The `data` member of a list response, or null.
fn data_of(mut value: Value) -> Value {
  value
    .get_mut("data")
    .map(Value::take)
    .unwrap_or(Value::Null)
}

fn application_health_check_ids(application_health: &Value) -> Vec<u64> {
  application_health
    .get("data")
    .and_then(Value::as_array)
    .map(|checks| {
      checks
        .iter()
        .filter_map(|check| check.get("id").and_then(Value::as_u64))
        .collect()
    })
    .unwrap_or_default()
}

/// Gather every report section for `site_id` and persist the snapshot.
pub async fn generate_report_snapshot<S: CacheStorage>(
  client: &OhDearClient,
  cache: &CacheStore<S>,
  site_id: u64,
  now: NaiveDateTime,
) -> Result<ReportSnapshot> {
  let builder = ReportBuilder {
    client,
    cache,
    site_id,
    range: DateRange::month_to_date(now),
  };

  let snapshot = builder.build().await?;
  let report = cache.write(&build_key(site_id, Section::Report), snapshot)?;
  info!(site_id, "report snapshot written");

  Ok(report)
}
