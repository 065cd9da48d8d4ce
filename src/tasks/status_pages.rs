//! Keep a status page in sync with a tag.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::ohdear::types::{ListResponse, Site, StatusPage};
use crate::ohdear::OhDearClient;

#[derive(Debug, Serialize)]
pub struct SyncOutcome {
  pub status_page_id: u64,
  pub status: u16,
  pub count: usize,
  pub synced: Vec<String>,
}

/// Make the status page on `domain` list exactly the sites tagged `tag`.
pub async fn sync_status_page(client: &OhDearClient, domain: &str, tag: &str) -> Result<SyncOutcome> {
  let status_pages: ListResponse<StatusPage> = client
    .get_json("status-pages", &[("domain", domain.to_string())], &[])
    .await?;

  let status_page = status_pages
    .data
    .first()
    .ok_or_else(|| eyre!("No status page found for domain {}", domain))?;

  let sites: ListResponse<Site> = client
    .get_json("sites", &[("tag", tag.to_string())], &[])
    .await?;

  let sites_to_sync: Vec<_> = sites
    .data
    .iter()
    .map(|site| json!({ "id": site.id, "clickable": true }))
    .collect();

  let response = client
    .post(
      &format!("status-pages/{}/sites", status_page.id),
      &json!({ "sync": true, "sites": sites_to_sync }),
    )
    .await?;

  info!(
    status_page_id = status_page.id,
    status = response.status(),
    count = sites_to_sync.len(),
    "synced status page"
  );

  Ok(SyncOutcome {
    status_page_id: status_page.id,
    status: response.status(),
    count: sites_to_sync.len(),
    synced: sites.data.into_iter().map(|site| site.url).collect(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_sync_posts_tagged_sites() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/status-pages"))
      .and(query_param("filter[domain]", "status.example.com"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [{"id": 12, "title": "Example status"}]
      })))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/sites"))
      .and(query_param("filter[tag]", "production"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [{"id": 1, "url": "https://a"}, {"id": 2, "url": "https://b"}]
      })))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/status-pages/12/sites"))
      .and(body_json(json!({
        "sync": true,
        "sites": [{"id": 1, "clickable": true}, {"id": 2, "clickable": true}]
      })))
      .respond_with(ResponseTemplate::new(200))
      .expect(1)
      .mount(&server)
      .await;

    let client = OhDearClient::with_token(&server.uri(), "token").unwrap();
    let outcome = sync_status_page(&client, "status.example.com", "production")
      .await
      .unwrap();

    assert_eq!(outcome.status, 200);
    assert_eq!(outcome.count, 2);
    assert_eq!(outcome.synced, vec!["https://a", "https://b"]);
  }

  #[tokio::test]
  async fn test_missing_status_page_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/status-pages"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
      .mount(&server)
      .await;

    let client = OhDearClient::with_token(&server.uri(), "token").unwrap();
    let err = sync_status_page(&client, "status.example.com", "production")
      .await
      .unwrap_err();

    assert!(err.to_string().contains("status.example.com"));
  }
}
