//! On-demand check runs.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{build_key, CacheStorage, CacheStore};
use crate::ohdear::template::CheckType;
use crate::ohdear::types::Site;
use crate::ohdear::OhDearClient;

#[derive(Debug, Serialize)]
pub struct RunRequested {
  pub check_id: u64,
  pub status: u16,
  pub run: Value,
}

/// Fetch a site through the cache, stored under `<id>-site`.
pub async fn cached_site<S: CacheStorage>(
  client: &OhDearClient,
  cache: &CacheStore<S>,
  site_id: u64,
) -> Result<Value> {
  let path = format!("sites/{}", site_id);
  cache
    .get_or_compute(&build_key(site_id, "site"), || {
      client.get_json::<Value>(&path, &[], &[])
    })
    .await
}

/// Ask Oh Dear to run the site's check of `check_type` now.
///
/// Returns `None` when the site has no such check.
pub async fn request_run<S: CacheStorage>(
  client: &OhDearClient,
  cache: &CacheStore<S>,
  site_id: u64,
  check_type: CheckType,
) -> Result<Option<RunRequested>> {
  let site: Site = serde_json::from_value(cached_site(client, cache, site_id).await?)
    .map_err(|e| eyre!("Failed to parse site {}: {}", site_id, e))?;

  let Some(check) = site
    .checks
    .iter()
    .rev()
    .find(|check| check.check_type == check_type.as_str())
  else {
    warn!(site_id, %check_type, "check not found");
    return Ok(None);
  };

  let response = client
    .post_empty(&format!("checks/{}/request-run", check.id))
    .await?;
  info!(site_id, check_id = check.id, status = response.status(), "requested check run");

  Ok(Some(RunRequested {
    check_id: check.id,
    status: response.status(),
    run: response.message(),
  }))
}
