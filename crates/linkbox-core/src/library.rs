//! Application façade
//!
//! `Library` owns the open bookmark document and the settings store and
//! implements the open / save / save-as flow on top of them. Paths come from
//! a [`FilePicker`] supplied by the front end; the library never prompts by
//! itself.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::bookmarks::DocumentStore;
use crate::config::Config;
use crate::document::Document;
use crate::error::StoreResult;
use crate::settings::{Settings, SettingsStore};
use crate::store::{LoadOutcome, SyncedFile, WatchOutcome};

/// Source of user-chosen paths (open/save dialogs)
///
/// `None` means the user cancelled.
pub trait FilePicker {
    fn pick_open(&mut self) -> Option<PathBuf>;

    /// Choose a destination, starting from the current file if there is one
    fn pick_save(&mut self, current: Option<&Path>) -> Option<PathBuf>;
}

/// Which store a watcher event was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryEvent {
    Document(WatchOutcome),
    Settings(WatchOutcome),
}

/// The open document plus persisted settings
pub struct Library {
    documents: DocumentStore,
    settings: SettingsStore,
    settings_path: PathBuf,
}

impl Library {
    /// Build stores from configuration. Nothing is read until [`init`](Self::init).
    pub fn new(config: &Config) -> Self {
        Self::with_stores(
            SyncedFile::new(Document::new(), config.document_options()).with_label("document"),
            SyncedFile::new(Settings::default(), config.settings_options())
                .with_label("settings"),
            config.settings_path.clone(),
        )
    }

    /// Assemble from pre-built stores (custom watch sources, tests)
    pub fn with_stores(
        documents: DocumentStore,
        settings: SettingsStore,
        settings_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            documents,
            settings,
            settings_path: settings_path.into(),
        }
    }

    /// Load (or create) the settings file and start watching it
    pub async fn init(&mut self) -> StoreResult<LoadOutcome> {
        let path = self.settings_path.clone();
        self.settings.init(path).await
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn documents_mut(&mut self) -> &mut DocumentStore {
        &mut self.documents
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    // ==================== Open ====================

    /// Open the document at `path`
    ///
    /// The path is remembered as the last opened file even when loading it
    /// fails, so the next start retries it.
    pub async fn open_path(&mut self, path: impl Into<PathBuf>) -> StoreResult<LoadOutcome> {
        let path = path.into();
        self.documents.stop_watching();

        let result = self.documents.load(&path).await;
        self.watch_document();
        self.remember(&path).await;

        result
    }

    /// Ask the picker for a file and open it; `None` if cancelled
    pub async fn open(
        &mut self,
        picker: &mut dyn FilePicker,
    ) -> StoreResult<Option<LoadOutcome>> {
        match picker.pick_open() {
            Some(path) => self.open_path(path).await.map(Some),
            None => Ok(None),
        }
    }

    /// Reopen the file recorded in settings
    ///
    /// Returns `None` when nothing was recorded or the file has since
    /// disappeared; a vanished file is not recreated.
    pub async fn restore_last(&mut self) -> StoreResult<Option<LoadOutcome>> {
        let Some(path) = self.settings.last_opened_file().map(Path::to_path_buf) else {
            return Ok(None);
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            warn!("Last opened file {:?} no longer exists", path);
            return Ok(None);
        }

        info!("Restoring last opened file {:?}", path);
        self.open_path(path).await.map(Some)
    }

    /// Start over with an empty, unsaved document
    pub fn new_document(&mut self) {
        self.documents.clear_path();
        self.documents.reset(Document::new());
    }

    // ==================== Save ====================

    /// Save to the current file, asking for one first if there is none
    ///
    /// Returns `false` when the picker was cancelled.
    pub async fn save(&mut self, picker: &mut dyn FilePicker) -> StoreResult<bool> {
        if self.documents.path().is_none() {
            return self.save_as(picker).await;
        }
        self.documents.save().await?;
        Ok(true)
    }

    /// Save to a newly picked file and switch to it
    ///
    /// The current path is kept if the write fails.
    pub async fn save_as(&mut self, picker: &mut dyn FilePicker) -> StoreResult<bool> {
        let Some(path) = picker.pick_save(self.documents.path()) else {
            return Ok(false);
        };

        self.documents.save_as(&path).await?;
        self.watch_document();
        self.remember(&path).await;
        Ok(true)
    }

    // ==================== Status ====================

    /// File name for a title bar; "• " marks unsaved changes
    pub fn display_name(&self) -> String {
        let name = self
            .documents
            .path()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());

        if self.documents.is_dirty() {
            format!("• {}", name)
        } else {
            name
        }
    }

    /// Wait for a change on either file and apply it
    ///
    /// Returns `None` once a watcher feed closes.
    pub async fn next_event(&mut self) -> Option<LibraryEvent> {
        tokio::select! {
            event = self.documents.next_watch_event() => {
                let event = event?;
                Some(LibraryEvent::Document(self.documents.handle_watch_event(event).await))
            }
            event = self.settings.next_watch_event() => {
                let event = event?;
                Some(LibraryEvent::Settings(self.settings.handle_watch_event(event).await))
            }
        }
    }

    fn watch_document(&mut self) {
        if self.documents.path().is_none() {
            return;
        }
        if let Err(e) = self.documents.start_watching() {
            warn!("Document will not follow external edits: {}", e);
        }
    }

    async fn remember(&mut self, path: &Path) {
        if let Err(e) = self.settings.set_last_file(path).await {
            warn!("Could not record last opened file: {}", e);
        }
    }
}
