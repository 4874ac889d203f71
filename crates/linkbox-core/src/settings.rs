//! Persisted preferences
//!
//! A small JSON file at a fixed location, synchronized with the same
//! load/save/watch protocol as documents. Currently holds the last opened
//! document so it can be reopened on the next start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreResult;
use crate::store::{LoadOutcome, SyncedFile};
use crate::value::StoreValue;

/// Preference record stored in `settings.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_file: Option<PathBuf>,
}

impl StoreValue for Settings {
    fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// The synchronized settings file
pub type SettingsStore = SyncedFile<Settings>;

impl SyncedFile<Settings> {
    /// Load the settings file (creating it on first run) and watch it
    ///
    /// A watcher that fails to start is logged, not returned: settings still
    /// work, they just won't follow external edits.
    pub async fn init(&mut self, path: impl Into<PathBuf>) -> StoreResult<LoadOutcome> {
        let outcome = self.load(path).await?;
        if let Err(e) = self.start_watching() {
            warn!("Settings will not follow external edits: {}", e);
        }
        Ok(outcome)
    }

    pub fn last_opened_file(&self) -> Option<&Path> {
        self.value().last_opened_file.as_deref()
    }

    /// Remember `path` as the last opened document and write it out
    pub async fn set_last_file(&mut self, path: impl Into<PathBuf>) -> StoreResult<()> {
        let path = path.into();
        self.mutate(|settings| settings.last_opened_file = Some(path));
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreOptions, WatchOutcome};
    use crate::watch::{WatchEvent, WatchEventKind};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn settings_store() -> SettingsStore {
        SyncedFile::new(Settings::default(), StoreOptions::default()).with_label("settings")
    }

    #[test]
    fn test_settings_format() {
        let empty = Settings::default().to_bytes().unwrap();
        assert_eq!(empty, b"{}\n");

        let settings = Settings {
            last_opened_file: Some(PathBuf::from("/home/me/links.json")),
        };
        let text = String::from_utf8(settings.to_bytes().unwrap()).unwrap();
        assert!(text.contains("\"lastOpenedFile\": \"/home/me/links.json\""));
        assert_eq!(Settings::from_bytes(text.as_bytes()).unwrap(), settings);
    }

    #[test]
    fn test_settings_ignores_unknown_keys() {
        let settings = Settings::from_bytes(br#"{"theme": "dark"}"#).unwrap();
        assert!(settings.last_opened_file.is_none());
    }

    #[tokio::test]
    async fn test_init_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config").join("settings.json");
        let mut store = settings_store();

        assert_eq!(store.init(&path).await.unwrap(), LoadOutcome::Created);
        assert!(path.exists());
        assert!(store.is_watching());
        assert!(store.last_opened_file().is_none());
    }

    #[tokio::test]
    async fn test_set_last_file_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");

        {
            let mut store = settings_store();
            store.init(&path).await.unwrap();
            store.set_last_file("/data/links.json").await.unwrap();
            assert!(!store.is_dirty());
        }

        let mut store = settings_store();
        assert_eq!(store.init(&path).await.unwrap(), LoadOutcome::Loaded);
        assert_eq!(store.last_opened_file(), Some(Path::new("/data/links.json")));
    }

    #[tokio::test]
    async fn test_external_settings_edit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let mut store = settings_store();
        store.init(&path).await.unwrap();
        store.set_last_file("/data/a.json").await.unwrap();

        std::fs::write(&path, br#"{"lastOpenedFile": "/data/b.json"}"#).unwrap();

        let echo = store
            .handle_watch_event(WatchEvent::new(WatchEventKind::Modified, &path))
            .await;
        assert_eq!(echo, WatchOutcome::Suppressed);
        assert_eq!(store.last_opened_file(), Some(Path::new("/data/a.json")));

        let later = Instant::now() + Duration::from_millis(600);
        let outcome = store
            .handle_watch_event(WatchEvent::at(WatchEventKind::Modified, &path, later))
            .await;
        assert_eq!(outcome, WatchOutcome::Reloaded);
        assert_eq!(store.last_opened_file(), Some(Path::new("/data/b.json")));
    }
}
