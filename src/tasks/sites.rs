//! Site creation and bulk updates.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::SiteOutcome;
use crate::config::SiteDefinition;
use crate::ohdear::template::CheckType;
use crate::ohdear::types::{ListResponse, Site};
use crate::ohdear::OhDearClient;

/// Fields of a template site that never carry over to a copy.
const TEMPLATE_ONLY_FIELDS: &[&str] = &["id", "team_id", "url", "label", "checks"];

/// Create every desired site whose URL does not exist in the team yet.
pub async fn create_sites(
  client: &OhDearClient,
  team_id: u64,
  desired: &[SiteDefinition],
) -> Result<Vec<SiteOutcome>> {
  let existing: ListResponse<Site> = client
    .get_json("sites", &[("team_id", team_id.to_string())], &[])
    .await?;

  let missing = desired
    .iter()
    .filter(|site| !existing.data.iter().any(|s| s.url == site.url));

  let mut outcomes = Vec::new();
  for site in missing {
    let response = client.post("sites", &new_site_body(site, team_id)).await?;
    info!(url = %site.url, status = response.status(), "created site");

    outcomes.push(SiteOutcome {
      site_id: None,
      url: site.url.clone(),
      status: response.status(),
      message: response.message(),
    });
  }

  if outcomes.is_empty() {
    info!(team_id, "all sites already exist");
  }

  Ok(outcomes)
}

fn new_site_body(site: &SiteDefinition, team_id: u64) -> Value {
  let mut body = Map::new();
  body.insert("url".into(), Value::from(site.url.clone()));
  if let Some(label) = &site.label {
    body.insert("label".into(), Value::from(label.clone()));
  }
  body.insert("tags".into(), Value::from(site.tags.clone()));
  body.insert(
    "checks".into(),
    site.checks.iter().map(|check| Value::from(check.as_str())).collect(),
  );
  body.insert("team_id".into(), Value::from(team_id));
  Value::Object(body)
}

/// Request and response of a site created from a template.
#[derive(Debug, Serialize)]
pub struct ClonedSite {
  pub request: Value,
  pub status: u16,
  pub response: Value,
}

/// Create a site at `url` with all settings and enabled checks of an existing site.
pub async fn create_site_from_existing(
  client: &OhDearClient,
  template_site_id: u64,
  url: &str,
  team_id: Option<u64>,
) -> Result<ClonedSite> {
  let raw: Map<String, Value> = client
    .get_json(&format!("sites/{}", template_site_id), &[], &[])
    .await?;
  let template: Site = serde_json::from_value(Value::Object(raw.clone()))
    .map_err(|e| eyre!("Failed to parse site {}: {}", template_site_id, e))?;

  let request = site_from_template(&template, raw, url, team_id);

  let created = client.post("sites", &request).await?;
  info!(
    template_site_id,
    url,
    status = created.status(),
    "created site from template"
  );

  Ok(ClonedSite {
    status: created.status(),
    response: created.message(),
    request,
  })
}

fn site_from_template(
  template: &Site,
  raw: Map<String, Value>,
  url: &str,
  team_id: Option<u64>,
) -> Value {
  let mut data = Map::new();
  data.insert("url".into(), Value::from(url));
  data.insert(
    "team_id".into(),
    team_id.or(template.team_id).map(Value::from).unwrap_or(Value::Null),
  );

  data.extend(
    raw
      .into_iter()
      .filter(|(key, _)| !TEMPLATE_ONLY_FIELDS.contains(&key.as_str())),
  );

  // Later checks win when two carry the same setting.
  for settings in template.checks.iter().filter_map(|check| check.settings.as_ref()) {
    data.extend(settings.clone());
  }

  data.insert("checks".into(), Value::from(template.enabled_check_types()));
  Value::Object(data)
}

/// Enable the certificate health check on every site carrying `tag`.
pub async fn enable_certificate_health(
  client: &OhDearClient,
  tag: &str,
  expires_soon_threshold_in_days: u32,
) -> Result<Vec<SiteOutcome>> {
  let sites: ListResponse<Site> = client
    .get_json("sites", &[("tag", tag.to_string())], &[])
    .await?;

  let mut outcomes = Vec::new();
  for site in &sites.data {
    let mut checks = site.enabled_check_types();
    let certificate_health = CheckType::CertificateHealth.as_str();
    if !checks.iter().any(|check| check == certificate_health) {
      checks.push(certificate_health.to_string());
    }

    let body = serde_json::json!({
      "checks": checks,
      "certificate_health_check_expires_soon_threshold_in_days": expires_soon_threshold_in_days,
    });

    let response = client.put(&format!("sites/{}", site.id), &body).await?;
    if !response.is_success() {
      warn!(site_id = site.id, status = response.status(), "failed to enable certificate health");
    }

    outcomes.push(SiteOutcome {
      site_id: Some(site.id),
      url: site.url.clone(),
      status: response.status(),
      message: Value::Null,
    });
  }

  Ok(outcomes)
}

/// Replace the tags of every site carrying `tag`.
pub async fn update_site_tags(
  client: &OhDearClient,
  tag: &str,
  tags: &[String],
) -> Result<Vec<SiteOutcome>> {
  let sites: ListResponse<Site> = client
    .get_json("sites", &[("tag", tag.to_string())], &[])
    .await?;

  let mut outcomes = Vec::new();
  for site in &sites.data {
    let response = client
      .put(&format!("sites/{}", site.id), &serde_json::json!({ "tags": tags }))
      .await?;
    info!(site_id = site.id, status = response.status(), "updated site tags");

    outcomes.push(SiteOutcome {
      site_id: Some(site.id),
      url: site.url.clone(),
      status: response.status(),
      message: Value::Null,
    });
  }

  Ok(outcomes)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn definition(url: &str, checks: Vec<CheckType>) -> SiteDefinition {
    SiteDefinition {
      url: url.to_string(),
      label: Some("Example".to_string()),
      tags: vec!["example".to_string()],
      checks,
    }
  }

  #[tokio::test]
  async fn test_create_sites_skips_existing_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/sites"))
      .and(query_param("filter[team_id]", "5"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [{"id": 1, "url": "https://example.com?test=1"}]
      })))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/sites"))
      .and(body_json(json!({
        "url": "https://example.com?test=2",
        "label": "Example",
        "tags": ["example"],
        "checks": ["uptime", "certificate_health"],
        "team_id": 5
      })))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 2})))
      .expect(1)
      .mount(&server)
      .await;

    let client = OhDearClient::with_token(&server.uri(), "token").unwrap();
    let desired = vec![
      definition("https://example.com?test=1", vec![CheckType::Uptime]),
      definition(
        "https://example.com?test=2",
        vec![CheckType::Uptime, CheckType::CertificateHealth],
      ),
    ];

    let outcomes = create_sites(&client, 5, &desired).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].url, "https://example.com?test=2");
    assert_eq!(outcomes[0].status, 201);
  }

  #[test]
  fn test_site_from_template_merges_settings() {
    let raw = json!({
      "id": 3,
      "team_id": 5,
      "url": "https://template.example.com",
      "label": "Template",
      "uptime_check_location": "paris",
      "checks": [
        {"id": 1, "type": "uptime", "enabled": true, "settings": {"uptime_check_timeout": 5}},
        {"id": 2, "type": "dns", "enabled": false, "settings": {"dns_monitor_main_domain": true}},
        {"id": 3, "type": "domain", "enabled": true}
      ]
    });
    let template: Site = serde_json::from_value(raw.clone()).unwrap();
    let Value::Object(raw) = raw else { unreachable!() };

    let data = site_from_template(&template, raw, "https://copy.example.com", None);

    assert_eq!(
      data,
      json!({
        "url": "https://copy.example.com",
        "team_id": 5,
        "uptime_check_location": "paris",
        "uptime_check_timeout": 5,
        "dns_monitor_main_domain": true,
        "checks": ["uptime", "domain"]
      })
    );
  }

  #[test]
  fn test_site_from_template_explicit_team() {
    let raw = json!({"id": 3, "team_id": 5, "url": "https://t", "checks": []});
    let template: Site = serde_json::from_value(raw.clone()).unwrap();
    let Value::Object(raw) = raw else { unreachable!() };

    let data = site_from_template(&template, raw, "https://copy", Some(9));
    assert_eq!(data["team_id"], 9);
  }

  #[tokio::test]
  async fn test_enable_certificate_health_keeps_enabled_checks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/sites"))
      .and(query_param("filter[tag]", "production"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [
          {"id": 1, "url": "https://a", "checks": [
            {"id": 10, "type": "uptime", "enabled": true},
            {"id": 11, "type": "dns", "enabled": false}
          ]},
          {"id": 2, "url": "https://b", "checks": [
            {"id": 20, "type": "certificate_health", "enabled": true}
          ]}
        ]
      })))
      .mount(&server)
      .await;
    Mock::given(method("PUT"))
      .and(path("/sites/1"))
      .and(body_json(json!({
        "checks": ["uptime", "certificate_health"],
        "certificate_health_check_expires_soon_threshold_in_days": 10
      })))
      .respond_with(ResponseTemplate::new(200))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("PUT"))
      .and(path("/sites/2"))
      .and(body_json(json!({
        "checks": ["certificate_health"],
        "certificate_health_check_expires_soon_threshold_in_days": 10
      })))
      .respond_with(ResponseTemplate::new(200))
      .expect(1)
      .mount(&server)
      .await;

    let client = OhDearClient::with_token(&server.uri(), "token").unwrap();
    let outcomes = enable_certificate_health(&client, "production", 10)
      .await
      .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.status == 200));
  }

  #[tokio::test]
  async fn test_update_site_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/sites"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [{"id": 4, "url": "https://a"}]
      })))
      .mount(&server)
      .await;
    Mock::given(method("PUT"))
      .and(path("/sites/4"))
      .and(body_json(json!({"tags": ["production", "example"]})))
      .respond_with(ResponseTemplate::new(200))
      .expect(1)
      .mount(&server)
      .await;

    let client = OhDearClient::with_token(&server.uri(), "token").unwrap();
    let tags = vec!["production".to_string(), "example".to_string()];
    let outcomes = update_site_tags(&client, "production", &tags).await.unwrap();

    assert_eq!(outcomes[0].site_id, Some(4));
  }
}
