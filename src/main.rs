mod cache;
mod config;
mod logging;
mod matching;
mod ohdear;
mod tasks;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;

use cache::{CacheStorage, CacheStore, FileStorage, MemoryStorage};
use config::Config;
use ohdear::template::CheckType;
use ohdear::OhDearClient;

#[derive(Parser, Debug)]
#[command(name = "ohdear-tasks")]
#[command(about = "Administrative and reporting tasks for Oh Dear")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./ohdear-tasks.yaml or $XDG_CONFIG_HOME/ohdear-tasks/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Directory for cached API responses (must exist or be creatable)
  #[arg(long, global = true)]
  cache_dir: Option<PathBuf>,

  /// Keep cached responses in memory for this run only
  #[arg(long, global = true)]
  no_cache: bool,

  /// Also write logs to this file
  #[arg(long, global = true)]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  task: Task,
}

#[derive(Subcommand, Debug)]
enum Task {
  /// Create the sites listed in the config file that don't exist yet
  CreateSites {
    #[arg(long)]
    team_id: Option<u64>,
  },
  /// Create a new site with the settings and checks of an existing one
  CloneSite {
    /// Id of the site to copy from
    template_site_id: u64,
    /// URL of the new site
    #[arg(long)]
    url: String,
    /// Team of the new site (default: the template's team)
    #[arg(long)]
    team_id: Option<u64>,
  },
  /// Enable the certificate health check on all sites with a tag
  EnableCertificateHealth {
    #[arg(long, default_value = "production")]
    tag: String,
    #[arg(long, default_value_t = 10)]
    threshold_days: u32,
  },
  /// Replace the tags of all sites with a tag
  UpdateTags {
    #[arg(long, default_value = "production")]
    tag: String,
    /// New tags, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    set: Vec<String>,
  },
  /// Make a status page show exactly the sites with a tag
  SyncStatusPage {
    tag: String,
    /// Status page domain (default: status_page_domain from the config file)
    #[arg(long)]
    domain: Option<String>,
  },
  /// Replace site-level notifications with the configured tag notifications
  MigrateNotifications {
    #[arg(long)]
    team_id: Option<u64>,
  },
  /// Copy a labelled team notification destination to another team
  CopyNotificationTemplate {
    #[arg(long)]
    team_id: u64,
    /// Label of the destination to copy (default: notification_template_label)
    #[arg(long)]
    label: Option<String>,
  },
  /// Request an on-demand run of one of a site's checks
  RunCheck {
    site_id: u64,
    check_type: CheckType,
  },
  /// Build and cache a month-to-date report snapshot for a site
  Report { site_id: u64 },
  /// Print the full site settings template
  Template,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn open_file_cache(config: &Config) -> Result<CacheStore> {
  std::fs::create_dir_all(&config.cache_dir).map_err(|e| {
    eyre!(
      "Failed to create cache directory {}: {}",
      config.cache_dir.display(),
      e
    )
  })?;
  Ok(CacheStore::new(FileStorage::new(&config.cache_dir)))
}

/// Run the cache-backed tasks against either the cache directory or memory.
async fn run_cached<S: CacheStorage>(
  task: Task,
  client: &OhDearClient,
  cache: &CacheStore<S>,
) -> Result<()> {
  match task {
    Task::RunCheck {
      site_id,
      check_type,
    } => match tasks::checks::request_run(client, cache, site_id, check_type).await? {
      Some(run) => print_json(&run),
      None => Err(eyre!("Site {} has no {} check", site_id, check_type)),
    },
    Task::Report { site_id } => {
      let now = chrono::Local::now().naive_local();
      print_json(&tasks::report::generate_report_snapshot(client, cache, site_id, now).await?)
    }
    other => Err(eyre!("{:?} does not use the cache", other)),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  if let Err(e) = dotenvy::dotenv() {
    if !e.not_found() {
      eprintln!("Warning: Failed to load .env file: {}", e);
    }
  }

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;
  if let Some(cache_dir) = args.cache_dir {
    config.cache_dir = cache_dir;
  }

  let log_file = args.log_file.or_else(|| config.log.file.clone());
  let _log_guard = logging::init(config.log.level.as_deref(), log_file.as_deref())?;

  let client = || OhDearClient::new(&config);

  match args.task {
    Task::Template => print_json(&ohdear::template::site_template()),
    Task::CreateSites { team_id } => {
      let team_id = config.team_id(team_id)?;
      print_json(&tasks::sites::create_sites(&client()?, team_id, &config.sites).await?)
    }
    Task::CloneSite {
      template_site_id,
      url,
      team_id,
    } => print_json(
      &tasks::sites::create_site_from_existing(&client()?, template_site_id, &url, team_id).await?,
    ),
    Task::EnableCertificateHealth {
      tag,
      threshold_days,
    } => print_json(
      &tasks::sites::enable_certificate_health(&client()?, &tag, threshold_days).await?,
    ),
    Task::UpdateTags { tag, set } => {
      print_json(&tasks::sites::update_site_tags(&client()?, &tag, &set).await?)
    }
    Task::SyncStatusPage { tag, domain } => {
      let domain = domain
        .or_else(|| config.status_page_domain.clone())
        .ok_or_else(|| {
          eyre!("No status page domain. Pass --domain or set status_page_domain in the config file.")
        })?;
      print_json(&tasks::status_pages::sync_status_page(&client()?, &domain, &tag).await?)
    }
    Task::MigrateNotifications { team_id } => {
      let team_id = config.team_id(team_id)?;
      print_json(
        &tasks::notifications::migrate_to_tag_notifications(
          &client()?,
          team_id,
          &config.tag_notifications,
        )
        .await?,
      )
    }
    Task::CopyNotificationTemplate { team_id, label } => {
      let label = label.unwrap_or_else(|| config.notification_template_label.clone());
      print_json(
        &tasks::notifications::copy_team_notification_template(&client()?, team_id, &label)
          .await?,
      )
    }
    task @ (Task::RunCheck { .. } | Task::Report { .. }) => {
      let client = client()?;
      if args.no_cache {
        run_cached(task, &client, &CacheStore::new(MemoryStorage::new())).await
      } else {
        run_cached(task, &client, &open_file_cache(&config)?).await
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cli_parses_run_check() {
    let args = Args::try_parse_from(["ohdear-tasks", "run-check", "9", "certificate_health"]).unwrap();
    match args.task {
      Task::RunCheck {
        site_id,
        check_type,
      } => {
        assert_eq!(site_id, 9);
        assert_eq!(check_type, CheckType::CertificateHealth);
      }
      other => panic!("unexpected task {:?}", other),
    }
  }

  #[test]
  fn test_cli_rejects_unknown_check_type() {
    assert!(Args::try_parse_from(["ohdear-tasks", "run-check", "9", "telepathy"]).is_err());
  }

  #[test]
  fn test_cli_splits_tags() {
    let args = Args::try_parse_from([
      "ohdear-tasks",
      "update-tags",
      "--set",
      "production,example",
    ])
    .unwrap();
    match args.task {
      Task::UpdateTags { tag, set } => {
        assert_eq!(tag, "production");
        assert_eq!(set, vec!["production", "example"]);
      }
      other => panic!("unexpected task {:?}", other),
    }
  }

  #[test]
  fn test_cli_parses_template() {
    let args = Args::try_parse_from(["ohdear-tasks", "template"]).unwrap();
    assert!(matches!(args.task, Task::Template));
  }

  #[test]
  fn test_global_cache_dir_after_subcommand() {
    let args =
      Args::try_parse_from(["ohdear-tasks", "report", "9", "--cache-dir", "/tmp/ohdear"]).unwrap();
    assert_eq!(args.cache_dir, Some(PathBuf::from("/tmp/ohdear")));
  }
}
