use crate::config::Config;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Build the query string for a request.
///
/// Filters become `filter[<key>]=<value>` and come first, plain params follow
/// as `<key>=<value>`. Values are percent-encoded, keys are sent as given.
pub fn build_query_string(filters: &[(&str, String)], params: &[(&str, String)]) -> String {
  filters
    .iter()
    .map(|(key, value)| format!("filter[{}]={}", key, urlencoding::encode(value)))
    .chain(
      params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value))),
    )
    .collect::<Vec<_>>()
    .join("&")
}

/// Response of a single API call: status plus the undecoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
  method: Method,
  path: String,
  status: StatusCode,
  body: Vec<u8>,
}

impl ApiResponse {
  pub fn status(&self) -> u16 {
    self.status.as_u16()
  }

  pub fn is_success(&self) -> bool {
    self.status.is_success()
  }

  /// Decode the body as JSON.
  pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
    serde_json::from_slice(&self.body).map_err(|e| {
      eyre!(
        "Failed to decode response of {} {} (HTTP {}): {}",
        self.method,
        self.path,
        self.status,
        e
      )
    })
  }

  /// Body as JSON when it is JSON, as text otherwise, null when empty.
  ///
  /// Used to report what the API said without failing on empty or HTML bodies.
  pub fn message(&self) -> Value {
    if self.body.is_empty() {
      return Value::Null;
    }
    serde_json::from_slice(&self.body)
      .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&self.body).into_owned()))
  }

  /// Turn a non-2xx response into an error carrying the body.
  pub fn error_for_status(self) -> Result<Self> {
    if self.is_success() {
      return Ok(self);
    }
    Err(eyre!(
      "{} {} failed (HTTP {}): {}",
      self.method,
      self.path,
      self.status,
      String::from_utf8_lossy(&self.body)
    ))
  }
}

/// Oh Dear API client wrapper
#[derive(Clone)]
pub struct OhDearClient {
  http: reqwest::Client,
  base_url: Url,
  timeout: Option<Duration>,
}

impl OhDearClient {
  /// Create a client from configuration and the OHDEAR_API_KEY token.
  ///
  /// Fails when no token is available.
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;
    let client = Self::with_token(&config.api.url, &token)?;
    Ok(client.with_timeout(Duration::from_secs(config.api.timeout_secs)))
  }

  pub fn with_token(base_url: &str, token: &str) -> Result<Self> {
    if token.is_empty() {
      return Err(eyre!("Oh Dear API token is empty"));
    }

    let base_url = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base_url =
      Url::parse(&base_url).map_err(|e| eyre!("Invalid API URL {}: {}", base_url, e))?;

    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
      .map_err(|e| eyre!("Invalid API token: {}", e))?;
    auth.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      timeout: None,
    })
  }

  /// Fail requests that take longer than `timeout` to complete.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  /// Absolute URL for an endpoint, with filters and params applied.
  pub fn endpoint(
    &self,
    path: &str,
    filters: &[(&str, String)],
    params: &[(&str, String)],
  ) -> Result<Url> {
    let mut url = self
      .base_url
      .join(path.trim_start_matches('/'))
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))?;

    let query = build_query_string(filters, params);
    url.set_query(if query.is_empty() { None } else { Some(&query) });

    Ok(url)
  }

  pub async fn get(
    &self,
    path: &str,
    filters: &[(&str, String)],
    params: &[(&str, String)],
  ) -> Result<ApiResponse> {
    let url = self.endpoint(path, filters, params)?;
    self.send(Method::GET, path, url, None).await
  }

  /// GET an endpoint and decode its JSON body, failing on non-2xx responses.
  pub async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    filters: &[(&str, String)],
    params: &[(&str, String)],
  ) -> Result<T> {
    self.get(path, filters, params).await?.error_for_status()?.json()
  }

  pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
    let url = self.endpoint(path, &[], &[])?;
    self.send(Method::POST, path, url, Some(encode(body)?)).await
  }

  /// POST without a request body.
  pub async fn post_empty(&self, path: &str) -> Result<ApiResponse> {
    let url = self.endpoint(path, &[], &[])?;
    self.send(Method::POST, path, url, None).await
  }

  pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
    let url = self.endpoint(path, &[], &[])?;
    self.send(Method::PUT, path, url, Some(encode(body)?)).await
  }

  pub async fn del(&self, path: &str) -> Result<ApiResponse> {
    let url = self.endpoint(path, &[], &[])?;
    self.send(Method::DELETE, path, url, None).await
  }

  async fn send(
    &self,
    method: Method,
    path: &str,
    url: Url,
    body: Option<Vec<u8>>,
  ) -> Result<ApiResponse> {
    debug!(%method, %url, "sending request");

    let mut request = self.http.request(method.clone(), url);
    if let Some(timeout) = self.timeout {
      request = request.timeout(timeout);
    }
    if let Some(body) = body {
      request = request.body(body);
    }

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Failed to send {} {}: {}", method, path, e))?;

    let status = response.status();
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response of {} {}: {}", method, path, e))?
      .to_vec();

    debug!(%method, path, status = status.as_u16(), "received response");

    Ok(ApiResponse {
      method,
      path: path.to_string(),
      status,
      body,
    })
  }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>> {
  serde_json::to_vec(body).map_err(|e| eyre!("Failed to encode request body: {}", e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[test]
  fn test_query_string_filters_then_params() {
    let query = build_query_string(
      &[("started_at", "20240101000000".to_string())],
      &[("split", "day".to_string())],
    );
    assert_eq!(query, "filter[started_at]=20240101000000&split=day");
  }

  #[test]
  fn test_query_string_encodes_values() {
    let query = build_query_string(&[("tag", "env:production".to_string())], &[]);
    assert_eq!(query, "filter[tag]=env%3Aproduction");

    let query = build_query_string(&[], &[("q", "a b&c".to_string())]);
    assert_eq!(query, "q=a%20b%26c");
  }

  #[test]
  fn test_query_string_empty() {
    assert_eq!(build_query_string(&[], &[]), "");
  }

  #[test]
  fn test_endpoint_adds_trailing_slash_to_base() {
    let client = OhDearClient::with_token("https://ohdear.app/api", "token").unwrap();

    let url = client.endpoint("sites/1", &[], &[]).unwrap();
    assert_eq!(url.as_str(), "https://ohdear.app/api/sites/1");

    let url = client
      .endpoint("sites", &[("team_id", "5".to_string())], &[])
      .unwrap();
    assert_eq!(url.as_str(), "https://ohdear.app/api/sites?filter[team_id]=5");
  }

  #[test]
  fn test_empty_token_is_rejected() {
    assert!(OhDearClient::with_token("https://ohdear.app/api/", "").is_err());
  }

  #[test]
  fn test_message_falls_back_to_text() {
    let response = ApiResponse {
      method: Method::GET,
      path: "sites".to_string(),
      status: StatusCode::BAD_GATEWAY,
      body: b"<html>bad gateway</html>".to_vec(),
    };
    assert_eq!(response.message(), json!("<html>bad gateway</html>"));
    assert!(response.error_for_status().is_err());
  }

  #[tokio::test]
  async fn test_get_sends_bearer_token_and_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/sites"))
      .and(query_param("filter[team_id]", "5"))
      .and(header("authorization", "Bearer secret"))
      .and(header("accept", "application/json"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
      .expect(1)
      .mount(&server)
      .await;

    let client = OhDearClient::with_token(&server.uri(), "secret").unwrap();
    let response = client
      .get("sites", &[("team_id", "5".to_string())], &[])
      .await
      .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().unwrap(), json!({"data": []}));
  }

  #[tokio::test]
  async fn test_post_put_delete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/sites"))
      .and(body_json(json!({"url": "https://x"})))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
      .mount(&server)
      .await;
    Mock::given(method("PUT"))
      .and(path("/sites/1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/sites/1"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let client = OhDearClient::with_token(&server.uri(), "secret").unwrap();

    let created = client.post("sites", &json!({"url": "https://x"})).await.unwrap();
    assert_eq!(created.status(), 201);

    let updated = client.put("sites/1", &json!({"tags": []})).await.unwrap();
    assert_eq!(updated.status(), 200);

    let deleted = client.del("sites/1").await.unwrap();
    assert_eq!(deleted.status(), 204);
    assert_eq!(deleted.message(), Value::Null);
  }

  #[tokio::test]
  async fn test_get_json_fails_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/sites"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthenticated."})))
      .mount(&server)
      .await;

    let client = OhDearClient::with_token(&server.uri(), "wrong").unwrap();
    let err = client.get_json::<Value>("sites", &[], &[]).await.unwrap_err();

    assert!(err.to_string().contains("401"));
  }
}
