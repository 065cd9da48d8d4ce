//! Notification destination migrations.

use color_eyre::{eyre::eyre, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::TagNotificationTemplate;
use crate::matching::shallow_equals;
use crate::ohdear::types::{
  ListResponse, NotificationDestination, Site, Tag, TagNotificationDestination,
};
use crate::ohdear::OhDearClient;

/// One notification destination to create on one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagNotification {
  pub tag_id: u64,
  pub label: String,
  pub channel: String,
  pub destination: Map<String, Value>,
}

/// Expand each template into one notification per tag id, in order.
pub fn expand_templates(templates: &[TagNotificationTemplate]) -> Vec<TagNotification> {
  templates
    .iter()
    .flat_map(|template| {
      template.tag_ids.iter().map(|tag_id| TagNotification {
        tag_id: *tag_id,
        label: template.label.clone(),
        channel: template.channel.clone(),
        destination: template.destination.clone(),
      })
    })
    .collect()
}

/// Whether `notification` is already configured for the team.
///
/// Destinations are compared with `shallow_equals`, so destinations holding
/// nested objects never count as existing.
pub fn already_exists(
  existing: &[TagNotificationDestination],
  team_id: u64,
  notification: &TagNotification,
) -> bool {
  existing.iter().any(|current| {
    current.tag.team_id == Some(team_id)
      && current.tag.id == notification.tag_id
      && current.channel == notification.channel
      && shallow_equals(&current.destination, &notification.destination)
  })
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedNotification {
  pub label: String,
  pub tag_id: u64,
  pub status: u16,
  pub message: Value,
}

/// A creation request that never got a response.
#[derive(Debug, Clone, Serialize)]
pub struct FailedNotification {
  pub label: String,
  pub tag_id: u64,
  pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedNotification {
  pub site_id: u64,
  pub notification_id: u64,
  pub status: u16,
}

#[derive(Debug, Default, Serialize)]
pub struct MigrationOutcome {
  /// Set when the migration stopped early
  #[serde(skip_serializing_if = "Option::is_none")]
  pub aborted: Option<String>,
  pub skipped: usize,
  /// In completion order, not template order
  pub created: Vec<CreatedNotification>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub failed: Vec<FailedNotification>,
  pub deleted: Vec<DeletedNotification>,
}

/// Move a team from site-level notifications to tag notifications.
///
/// Missing tag notifications are created concurrently and every request is
/// awaited, whether or not the others fail. Only when all of them succeed are
/// the site-level notification destinations of every team site deleted.
pub async fn migrate_to_tag_notifications(
  client: &OhDearClient,
  team_id: u64,
  templates: &[TagNotificationTemplate],
) -> Result<MigrationOutcome> {
  let mut outcome = MigrationOutcome::default();
  let notifications = expand_templates(templates);

  let tags: ListResponse<Tag> = client.get_json("tags", &[], &[]).await?;
  if tags.data.is_empty() {
    warn!(team_id, "no tags found");
    outcome.aborted = Some(format!("No tags found for team {}", team_id));
    return Ok(outcome);
  }

  let existing: ListResponse<TagNotificationDestination> = client
    .get_json("tags/notification-destinations", &[], &[])
    .await?;

  let (present, missing): (Vec<_>, Vec<_>) = notifications
    .into_iter()
    .partition(|notification| already_exists(&existing.data, team_id, notification));
  outcome.skipped = present.len();

  let pending: FuturesUnordered<_> = missing
    .into_iter()
    .map(|notification| async move {
      let (label, tag_id) = (notification.label.clone(), notification.tag_id);
      create_tag_notification(client, notification)
        .await
        .map_err(|error| FailedNotification {
          label,
          tag_id,
          error: error.to_string(),
        })
    })
    .collect();
  let results: Vec<_> = pending.collect().await;

  for result in results {
    match result {
      Ok(created) => outcome.created.push(created),
      Err(failed) => {
        warn!(tag_id = failed.tag_id, error = %failed.error, "tag notification request failed");
        outcome.failed.push(failed);
      }
    }
  }

  let rejected = outcome
    .created
    .iter()
    .filter(|created| !(200..300).contains(&created.status))
    .count();
  if rejected > 0 || !outcome.failed.is_empty() {
    warn!(
      rejected,
      unsent = outcome.failed.len(),
      "failed to create tag notifications"
    );
    outcome.aborted = Some("Failed to create tag notifications".to_string());
    return Ok(outcome);
  }

  let sites: ListResponse<Site> = client
    .get_json("sites", &[("team_id", team_id.to_string())], &[])
    .await?;

  for site in &sites.data {
    let destinations: ListResponse<NotificationDestination> = client
      .get_json(&format!("sites/{}/notification-destinations", site.id), &[], &[])
      .await?;

    for destination in &destinations.data {
      let response = client
        .del(&format!(
          "sites/{}/notification-destinations/{}",
          site.id, destination.id
        ))
        .await?;
      info!(
        site_id = site.id,
        notification_id = destination.id,
        status = response.status(),
        "deleted site notification"
      );

      outcome.deleted.push(DeletedNotification {
        site_id: site.id,
        notification_id: destination.id,
        status: response.status(),
      });
    }
  }

  Ok(outcome)
}

async fn create_tag_notification(
  client: &OhDearClient,
  notification: TagNotification,
) -> Result<CreatedNotification> {
  let body = json!({
    "label": notification.label,
    "channel": notification.channel,
    "destination": notification.destination,
  });

  let response = client
    .post(
      &format!("tags/{}/notification-destinations", notification.tag_id),
      &body,
    )
    .await?;
  info!(
    tag_id = notification.tag_id,
    label = %notification.label,
    status = response.status(),
    "created tag notification"
  );

  Ok(CreatedNotification {
    label: notification.label,
    tag_id: notification.tag_id,
    status: response.status(),
    message: response.message(),
  })
}

#[derive(Debug, Serialize)]
pub struct CopiedNotification {
  pub status: u16,
  pub message: Value,
}

/// Copy the team notification destination labelled `label` to another team.
pub async fn copy_team_notification_template(
  client: &OhDearClient,
  team_id: u64,
  label: &str,
) -> Result<CopiedNotification> {
  let destinations: ListResponse<NotificationDestination> = client
    .get_json("team-notification-destinations", &[], &[])
    .await?;

  let template = destinations
    .data
    .iter()
    .find(|destination| destination.label.as_deref() == Some(label))
    .ok_or_else(|| eyre!("No team notification destination labelled {}", label))?;

  let response = client
    .post(
      &format!("team-notification-destinations/{}", team_id),
      &json!({
        "channel": template.channel,
        "destination": template.destination,
      }),
    )
    .await?;
  info!(team_id, label, status = response.status(), "copied notification destination");

  Ok(CopiedNotification {
    status: response.status(),
    message: response.message(),
  })
}
