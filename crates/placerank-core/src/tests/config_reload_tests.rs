//! Tests for reopening history with persisted snapshots and changed config

use super::fixtures::*;
use crate::{Error, Result};
use crate::clock::{Clock, ManualClock};
use crate::config::Config;
use crate::{HistoryService, VisitInput};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn reopen(config: Config, now: i64) -> Result<HistoryService> {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(now));
    HistoryService::with_clock(config, clock)
}

#[tokio::test]
async fn test_history_survives_reopen() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.store_path = Some(temp_dir.path().join("history.json"));

    {
        let (service, _clock) = service_with(config.clone());
        service
            .add_visits(["https://a/", "https://a/", "https://b/"])
            .await?;
    }

    let service = reopen(config, NOW)?;
    assert_eq!(service.count().await, 3);
    let top = service.get_top_frecent_sites(None).await;
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].url, "https://a/");
    assert_eq!(top[0].frecency, 200);

    Ok(())
}

#[tokio::test]
async fn test_reopen_rescores_against_clock() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.store_path = Some(temp_dir.path().join("history.json"));

    {
        let (service, _clock) = service_with(config.clone());
        service.add_visit("https://a/").await?;
    }

    let service = reopen(config, NOW + 60 * DAY)?;
    assert_eq!(service.get_link("https://a/").await.unwrap().frecency, 30);

    Ok(())
}

#[tokio::test]
async fn test_corrupt_snapshot_opens_empty() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    fs::write(&path, "{ invalid json ]").unwrap();

    let mut config = Config::default();
    config.store_path = Some(path.clone());
    let service = reopen(config, NOW)?;
    assert_eq!(service.count().await, 0);

    // The next write replaces the corrupt file
    service.add_visit("https://a/").await?;
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("https://a/"));

    Ok(())
}

#[tokio::test]
async fn test_clear_persists_empty_snapshot() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.store_path = Some(temp_dir.path().join("history.json"));

    let (service, _clock) = service_with(config.clone());
    service.add_visit("https://a/").await?;
    service.clear().await?;
    drop(service);

    let service = reopen(config, NOW)?;
    assert_eq!(service.count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_narrowed_allow_list_hides_loaded_pages() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    let store_path = temp_dir.path().join("history.json");

    fs::write(
        &config_path,
        format!(
            r#"{{"links": {{"allowedAboutPages": ["newtab", "config"]}}, "storePath": {}}}"#,
            serde_json::to_string(&store_path).unwrap()
        ),
    )
    .unwrap();
    let wide = Config::load(&config_path)?;
    {
        let service = reopen(wide, NOW)?;
        service
            .add_visits([VisitInput::new("about:config"), VisitInput::new("about:newtab")])
            .await?;
        assert_eq!(service.get_top_frecent_sites(None).await.len(), 2);
    }

    fs::write(
        &config_path,
        format!(
            r#"{{"storePath": {}}}"#,
            serde_json::to_string(&store_path).unwrap()
        ),
    )
    .unwrap();
    let narrow = Config::load(&config_path)?;
    assert_eq!(narrow.links.allowed_about_pages, vec!["newtab", "home"]);

    let service = reopen(narrow, NOW)?;
    assert_eq!(service.count().await, 2);
    let top = service.get_top_frecent_sites(None).await;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].url, "about:newtab");

    Ok(())
}

#[test]
fn test_unreadable_snapshot_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    fs::create_dir(&path).unwrap();

    let mut config = Config::default();
    config.store_path = Some(path);
    let result = reopen(config, NOW);
    assert!(matches!(result, Err(Error::Store(_))));
}

#[test]
fn test_invalid_config_rejected_by_service() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(&config_path, r#"{"links": {"maxLinks": 0}}"#).unwrap();
    assert!(Config::load(&config_path).is_err());

    let mut config = Config::default();
    config.frecency.sample_size = 0;
    assert!(reopen(config, NOW).is_err());
}
