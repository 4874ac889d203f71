//! File-synchronized store
//!
//! `SyncedFile<V>` keeps an in-memory value mirrored to one JSON file and
//! reacts to two independent change sources:
//!
//! - the owner's edits, applied with [`SyncedFile::mutate`] and written with
//!   [`SyncedFile::save`];
//! - edits made to the file by anything else, delivered by the watcher and
//!   applied with [`SyncedFile::handle_watch_event`].
//!
//! ## Self-write suppression
//!
//! Writing the file is itself visible to the watcher. `last_save_at` is
//! recorded before every write starts; a change event that arrives within
//! the self-write window after it is treated as an echo of our own write and
//! dropped. Anything later is an external edit and replaces the value
//! wholesale, discarding unsaved local edits (last writer wins).
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = SyncedFile::new(Document::new(), StoreOptions::default());
//! store.load("/home/me/links.json").await?;
//! store.start_watching()?;
//!
//! store.add_link(NewLink::new("https://example.com"));
//! store.save().await?;
//!
//! while let Some(event) = store.next_watch_event().await {
//!     store.handle_watch_event(event).await;
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch as revision;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::fsio;
use crate::value::StoreValue;
use crate::watch::{NotifyWatchSource, WatchEvent, WatchSource, WatchSubscription};

/// Default coalescing window for document change notifications
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Events arriving this soon after a save are treated as our own echo
pub const DEFAULT_SELF_WRITE_WINDOW: Duration = Duration::from_millis(500);

/// Timing knobs for one store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Passed to the watcher to coalesce bursts
    pub debounce: Duration,
    /// Self-write suppression window
    pub self_write_window: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            self_write_window: DEFAULT_SELF_WRITE_WINDOW,
        }
    }
}

/// How a successful load went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read and adopted
    Loaded,
    /// The file did not exist yet and was written from the current value
    Created,
}

/// What a watcher event did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Wrong kind, or not about the current file
    Ignored,
    /// Presumed echo of our own write
    Suppressed,
    /// External edit adopted
    Reloaded,
    /// Re-read or parse failed; previous value kept
    ReloadFailed,
}

/// An in-memory value mirrored to a file on disk
pub struct SyncedFile<V> {
    /// Name used in log messages
    label: &'static str,
    path: Option<PathBuf>,
    value: V,
    dirty: bool,
    saving: bool,
    last_error: String,
    last_save_at: Option<Instant>,
    /// Whether any load has been attempted on this store
    loaded_once: bool,
    options: StoreOptions,
    watch_source: Arc<dyn WatchSource>,
    subscription: Option<WatchSubscription>,
    revision: revision::Sender<u64>,
}

impl<V: StoreValue> SyncedFile<V> {
    /// Create a store with no backing file yet
    pub fn new(value: V, options: StoreOptions) -> Self {
        let (tx, _) = revision::channel(0);
        Self {
            label: "file",
            path: None,
            value,
            dirty: false,
            saving: false,
            last_error: String::new(),
            last_save_at: None,
            loaded_once: false,
            options,
            watch_source: Arc::new(NotifyWatchSource),
            subscription: None,
            revision: tx,
        }
    }

    /// Name the store in log output
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Replace the filesystem watcher backend
    pub fn with_watch_source(mut self, source: Arc<dyn WatchSource>) -> Self {
        self.watch_source = source;
        self
    }

    // ==================== State ====================

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// The value has changes not yet written to the file
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// A write is in flight
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Last load/save error, empty when healthy
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn last_save_at(&self) -> Option<Instant> {
        self.last_save_at
    }

    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Counter bumped on every observable change
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Wait for changes instead of polling [`revision`](Self::revision)
    pub fn subscribe(&self) -> revision::Receiver<u64> {
        self.revision.subscribe()
    }

    // ==================== Mutation ====================

    /// Apply an edit to the value and mark it dirty
    pub fn mutate<R>(&mut self, edit: impl FnOnce(&mut V) -> R) -> R {
        let result = edit(&mut self.value);
        self.dirty = true;
        self.bump();
        result
    }

    /// Replace the value wholesale, as if freshly loaded
    pub fn reset(&mut self, value: V) {
        self.value = value;
        self.dirty = false;
        self.last_error.clear();
        self.bump();
    }

    // ==================== Path & watching ====================

    /// Point the store at a different file
    ///
    /// Stops any active watch. Does not load or save.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.stop_watching();
        self.path = Some(path.into());
        self.bump();
    }

    /// Forget the backing file
    pub fn clear_path(&mut self) {
        self.stop_watching();
        self.path = None;
        self.bump();
    }

    /// Begin watching the current file
    ///
    /// A no-op when already watching that file.
    pub fn start_watching(&mut self) -> StoreResult<()> {
        let path = self.path.clone().ok_or(StoreError::NoPath)?;

        if let Some(sub) = &self.subscription {
            if sub.path() == path {
                return Ok(());
            }
        }
        self.stop_watching();

        let sub = self.watch_source.subscribe(&path, self.options.debounce)?;
        info!("Watching {} file {:?}", self.label, path);
        self.subscription = Some(sub);
        Ok(())
    }

    /// Cancel the active watch, if any
    pub fn stop_watching(&mut self) {
        if let Some(sub) = self.subscription.take() {
            debug!("Stopped watching {} file {:?}", self.label, sub.path());
            sub.cancel();
        }
    }

    /// Wait for the next watcher event
    ///
    /// Pends forever while not watching, so it can sit in a `select!` loop.
    /// Returns `None` only when the watcher feed has closed.
    pub async fn next_watch_event(&mut self) -> Option<WatchEvent> {
        match self.subscription.as_mut() {
            Some(sub) => sub.next().await,
            None => std::future::pending().await,
        }
    }

    /// Apply every event the watcher has already delivered
    pub async fn process_pending_events(&mut self) -> Vec<WatchOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let Some(event) = self.subscription.as_mut().and_then(|s| s.try_next()) else {
                break;
            };
            outcomes.push(self.handle_watch_event(event).await);
        }
        outcomes
    }

    // ==================== Load & save ====================

    /// Read `path` and adopt its contents
    ///
    /// On failure the value is left untouched and the error is recorded in
    /// `last_error`. The one exception is the very first load of this store
    /// hitting a missing file: the file is then created from the current
    /// value.
    pub async fn load(&mut self, path: impl Into<PathBuf>) -> StoreResult<LoadOutcome> {
        let path = path.into();
        let first_load = !self.loaded_once;
        self.loaded_once = true;

        match read_value::<V>(&path).await {
            Ok(value) => {
                if self.path.as_deref() != Some(path.as_path()) {
                    self.set_path(path.clone());
                }
                self.value = value;
                self.dirty = false;
                self.last_error.clear();
                self.bump();
                info!("Loaded {} file {:?}", self.label, path);
                Ok(LoadOutcome::Loaded)
            }
            Err(e) if first_load && e.is_not_found() => {
                info!("{} file {:?} does not exist, creating it", self.label, path);
                self.set_path(path);
                self.save().await?;
                Ok(LoadOutcome::Created)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Write the value to the current file
    ///
    /// At most one save runs at a time; a call made while saving is a no-op.
    pub async fn save(&mut self) -> StoreResult<()> {
        let path = self.path.clone().ok_or(StoreError::NoPath)?;
        self.persist(&path).await
    }

    /// Write the value to `path` and adopt it as the backing file on success
    ///
    /// The previous watch (if any) is stopped once the path changes.
    pub async fn save_as(&mut self, path: impl Into<PathBuf>) -> StoreResult<()> {
        let path = path.into();
        self.persist(&path).await?;
        if self.path.as_deref() != Some(path.as_path()) {
            self.set_path(path);
        }
        Ok(())
    }

    async fn persist(&mut self, path: &Path) -> StoreResult<()> {
        if self.saving {
            debug!("Save of {} file already in flight, skipping", self.label);
            return Ok(());
        }

        // Stamp before writing so events racing a slow write count as ours
        self.last_save_at = Some(Instant::now());
        self.saving = true;
        self.bump();

        let result = {
            let _flag = SavingFlag(&mut self.saving);
            write_value(&self.value, path).await
        };

        match &result {
            Ok(()) => {
                self.dirty = false;
                self.last_error.clear();
                debug!("Saved {} file {:?}", self.label, path);
            }
            Err(e) => self.record_error(e),
        }
        self.bump();
        result
    }

    // ==================== Watch protocol ====================

    /// React to one change notification for the watched file
    ///
    /// Modified/removed events outside the self-write window re-read the
    /// file. A good read replaces the value and clears `dirty`; a bad one is
    /// swallowed, since external tools often write non-atomically.
    pub async fn handle_watch_event(&mut self, event: WatchEvent) -> WatchOutcome {
        if !event.kind.triggers_reload() {
            return WatchOutcome::Ignored;
        }

        let Some(path) = self.path.clone() else {
            return WatchOutcome::Ignored;
        };
        if event.path != path {
            debug!("Ignoring event for stale path {:?}", event.path);
            return WatchOutcome::Ignored;
        }

        if let Some(saved_at) = self.last_save_at {
            let age = event.received_at.saturating_duration_since(saved_at);
            if age < self.options.self_write_window {
                debug!(
                    "Suppressed {:?} on {} file {:?} ({:?} after save)",
                    event.kind, self.label, path, age
                );
                return WatchOutcome::Suppressed;
            }
        }

        match read_value::<V>(&path).await {
            Ok(value) => {
                if self.dirty {
                    warn!(
                        "{} file {:?} changed on disk, discarding unsaved edits",
                        self.label, path
                    );
                }
                self.value = value;
                self.dirty = false;
                self.bump();
                info!("Reloaded {} file {:?} after external change", self.label, path);
                WatchOutcome::Reloaded
            }
            Err(e) => {
                debug!("Ignoring unreadable external change: {}", e);
                WatchOutcome::ReloadFailed
            }
        }
    }

    fn record_error(&mut self, error: &StoreError) {
        warn!("{} file error: {}", self.label, error);
        self.last_error = error.to_string();
        self.bump();
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

/// Clears the saving flag even if the save future is dropped mid-write
struct SavingFlag<'a>(&'a mut bool);

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

async fn read_value<V: StoreValue>(path: &Path) -> StoreResult<V> {
    let bytes = fsio::read_text(path)
        .await
        .map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    V::from_bytes(&bytes).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_value<V: StoreValue>(value: &V, path: &Path) -> StoreResult<()> {
    let bytes = value.to_bytes().map_err(StoreError::Serialize)?;
    fsio::write_text(path, &bytes)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::models::NewLink;
    use crate::watch::WatchEventKind;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    /// Hands out channel-backed subscriptions and keeps the senders
    #[derive(Default)]
    struct ChannelWatchSource {
        senders: Mutex<Vec<(PathBuf, mpsc::UnboundedSender<WatchEvent>)>>,
    }

    impl ChannelWatchSource {
        fn emit(&self, kind: WatchEventKind, path: &Path) -> bool {
            let senders = self.senders.lock().unwrap();
            senders
                .iter()
                .filter(|(p, _)| p == path)
                .any(|(_, tx)| tx.send(WatchEvent::new(kind, path)).is_ok())
        }

        fn subscriptions(&self) -> usize {
            self.senders.lock().unwrap().len()
        }
    }

    impl WatchSource for ChannelWatchSource {
        fn subscribe(&self, path: &Path, _debounce: Duration) -> StoreResult<WatchSubscription> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.senders.lock().unwrap().push((path.to_path_buf(), tx));
            Ok(WatchSubscription::from_channel(path, rx))
        }
    }

    fn store() -> SyncedFile<Document> {
        SyncedFile::new(Document::new(), StoreOptions::default())
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_millis(600)
    }

    fn write_doc(path: &Path, doc: &Document) {
        std::fs::write(path, doc.to_json().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_first_load_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let mut store = store();

        let outcome = store.load(&path).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Created);
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(!store.is_dirty());
        assert!(store.last_error().is_empty());

        let on_disk = Document::parse(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, Document::new());
    }

    #[tokio::test]
    async fn test_later_load_of_missing_file_records_error() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.json");
        let mut store = store();
        store.load(&first).await.unwrap();
        store.mutate(|doc| doc.insert_link(NewLink::new("https://a"), chrono::Utc::now()));

        let missing = temp_dir.path().join("missing.json");
        let err = store.load(&missing).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!missing.exists());
        assert!(!store.last_error().is_empty());
        // Value and path are untouched
        assert_eq!(store.value().links.len(), 1);
        assert_eq!(store.path(), Some(first.as_path()));
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_load_parse_error_keeps_value() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, b"{\"links\": [").unwrap();

        let mut store = store();
        store.mutate(|doc| doc.next_id());

        let err = store.load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(store.last_error().contains("Invalid JSON"));
        assert_eq!(store.value().id_counter, 1);
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn test_successful_load_clears_error_and_dirty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let mut doc = Document::new();
        doc.insert_link(NewLink::new("https://example.com"), chrono::Utc::now());
        write_doc(&path, &doc);

        let broken = temp_dir.path().join("broken.json");
        std::fs::write(&broken, b"not json").unwrap();

        let mut store = store();
        assert!(store.load(&broken).await.is_err());
        assert!(!store.last_error().is_empty());
        store.mutate(|_| ());

        assert_eq!(store.load(&path).await.unwrap(), LoadOutcome::Loaded);
        assert_eq!(store.value(), &doc);
        assert!(!store.is_dirty());
        assert!(store.last_error().is_empty());
    }

    #[tokio::test]
    async fn test_save_without_path() {
        let mut store = store();
        store.mutate(|doc| doc.next_id());

        let err = store.save().await.unwrap_err();
        assert!(matches!(err, StoreError::NoPath));
        assert!(store.is_dirty());
        assert!(store.last_save_at().is_none());
    }

    #[tokio::test]
    async fn test_save_writes_and_clears_dirty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let mut store = store();
        store.set_path(&path);

        store.mutate(|doc| doc.insert_link(NewLink::new("https://a"), chrono::Utc::now()));
        assert!(store.is_dirty());

        store.save().await.unwrap();
        assert!(!store.is_dirty());
        assert!(!store.is_saving());
        assert!(store.last_save_at().is_some());

        let on_disk = Document::parse(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(&on_disk, store.value());
    }

    #[tokio::test]
    async fn test_save_failure_records_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let mut store = store();
        store.set_path(blocker.join("links.json"));
        store.mutate(|doc| doc.next_id());

        let err = store.save().await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        // Stamped before the write was attempted
        assert!(store.last_save_at().is_some());
        assert!(store.is_dirty());
        assert!(!store.is_saving());
        assert!(store.last_error().contains("Failed to write"));
    }

    #[tokio::test]
    async fn test_save_as_adopts_path_on_success() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(ChannelWatchSource::default());
        let mut store = store().with_watch_source(source.clone());

        let first = temp_dir.path().join("first.json");
        store.save_as(&first).await.unwrap();
        store.start_watching().unwrap();
        assert!(store.is_watching());

        let second = temp_dir.path().join("second.json");
        store.save_as(&second).await.unwrap();
        assert_eq!(store.path(), Some(second.as_path()));
        // Switching files tears down the old watch
        assert!(!store.is_watching());
        assert!(second.exists());
    }

    #[tokio::test]
    async fn test_save_as_failure_keeps_path() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("links.json");
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let mut store = store();
        store.save_as(&good).await.unwrap();

        assert!(store.save_as(blocker.join("x.json")).await.is_err());
        assert_eq!(store.path(), Some(good.as_path()));
    }

    #[tokio::test]
    async fn test_start_watching_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let source = Arc::new(ChannelWatchSource::default());
        let mut store = store().with_watch_source(source.clone());

        assert!(matches!(
            store.start_watching().unwrap_err(),
            StoreError::NoPath
        ));

        store.set_path(&path);
        store.start_watching().unwrap();
        store.start_watching().unwrap();
        assert_eq!(source.subscriptions(), 1);

        store.stop_watching();
        store.stop_watching();
        assert!(!store.is_watching());
        assert!(!source.emit(WatchEventKind::Modified, &path));
    }

    #[tokio::test]
    async fn test_set_path_stops_watching() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(ChannelWatchSource::default());
        let mut store = store().with_watch_source(source.clone());

        store.set_path(temp_dir.path().join("a.json"));
        store.start_watching().unwrap();
        store.set_path(temp_dir.path().join("b.json"));
        assert!(!store.is_watching());

        store.start_watching().unwrap();
        assert_eq!(source.subscriptions(), 2);
        assert!(!source.emit(WatchEventKind::Modified, &temp_dir.path().join("a.json")));
    }

    #[tokio::test]
    async fn test_own_write_echo_is_suppressed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let mut store = store();
        store.save_as(&path).await.unwrap();

        // Another tool writes in the same instant our save finished
        let mut external = Document::new();
        external.insert_link(NewLink::new("https://elsewhere"), chrono::Utc::now());
        write_doc(&path, &external);

        store.mutate(|doc| doc.next_id());
        let before = store.value().clone();

        let outcome = store
            .handle_watch_event(WatchEvent::new(WatchEventKind::Modified, &path))
            .await;
        assert_eq!(outcome, WatchOutcome::Suppressed);
        assert_eq!(store.value(), &before);
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_external_edit_is_adopted() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let mut store = store();
        store.save_as(&path).await.unwrap();

        let mut external = Document::new();
        external.insert_link(NewLink::new("https://elsewhere"), chrono::Utc::now());
        write_doc(&path, &external);

        // Unsaved local edit loses to the file
        store.mutate(|doc| doc.insert_link(NewLink::new("https://local"), chrono::Utc::now()));

        let outcome = store
            .handle_watch_event(WatchEvent::at(WatchEventKind::Modified, &path, later()))
            .await;
        assert_eq!(outcome, WatchOutcome::Reloaded);
        assert_eq!(store.value(), &external);
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_external_edit_without_prior_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        write_doc(&path, &Document::new());

        let mut store = store();
        store.load(&path).await.unwrap();

        let mut external = Document::new();
        external.next_id();
        write_doc(&path, &external);

        let outcome = store
            .handle_watch_event(WatchEvent::new(WatchEventKind::Modified, &path))
            .await;
        assert_eq!(outcome, WatchOutcome::Reloaded);
        assert_eq!(store.value().id_counter, 1);
    }

    #[tokio::test]
    async fn test_ignored_event_kinds() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let mut store = store();
        store.set_path(&path);
        write_doc(&path, &Document::new());
        store.mutate(|doc| doc.next_id());

        for kind in [
            WatchEventKind::Created,
            WatchEventKind::Renamed,
            WatchEventKind::Other,
        ] {
            let outcome = store
                .handle_watch_event(WatchEvent::at(kind, &path, later()))
                .await;
            assert_eq!(outcome, WatchOutcome::Ignored);
        }

        let outcome = store
            .handle_watch_event(WatchEvent::at(
                WatchEventKind::Modified,
                temp_dir.path().join("other.json"),
                later(),
            ))
            .await;
        assert_eq!(outcome, WatchOutcome::Ignored);
        assert!(store.is_dirty());
        assert_eq!(store.value().id_counter, 1);
    }

    #[tokio::test]
    async fn test_unreadable_external_change_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let mut store = store();
        store.save_as(&path).await.unwrap();
        store.mutate(|doc| doc.next_id());

        std::fs::write(&path, b"{\"links\": [{\"id\"").unwrap();
        let outcome = store
            .handle_watch_event(WatchEvent::at(WatchEventKind::Modified, &path, later()))
            .await;
        assert_eq!(outcome, WatchOutcome::ReloadFailed);

        std::fs::remove_file(&path).unwrap();
        let outcome = store
            .handle_watch_event(WatchEvent::at(WatchEventKind::Removed, &path, later()))
            .await;
        assert_eq!(outcome, WatchOutcome::ReloadFailed);

        assert_eq!(store.value().id_counter, 1);
        assert!(store.is_dirty());
        assert!(store.last_error().is_empty());
    }

    #[tokio::test]
    async fn test_events_flow_through_subscription() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let source = Arc::new(ChannelWatchSource::default());
        let mut store = store().with_watch_source(source.clone());
        write_doc(&path, &Document::new());
        store.load(&path).await.unwrap();
        store.start_watching().unwrap();

        let mut external = Document::new();
        external.next_id();
        write_doc(&path, &external);

        assert!(source.emit(WatchEventKind::Created, &path));
        assert!(source.emit(WatchEventKind::Modified, &path));

        let outcomes = store.process_pending_events().await;
        assert_eq!(outcomes, vec![WatchOutcome::Ignored, WatchOutcome::Reloaded]);
        assert_eq!(store.value().id_counter, 1);
    }

    #[tokio::test]
    async fn test_revision_tracks_changes() {
        let mut store = store();
        let mut changes = store.subscribe();
        let start = store.revision();

        store.mutate(|doc| doc.next_id());
        assert!(store.revision() > start);
        assert!(changes.has_changed().unwrap());
        let _ = changes.borrow_and_update();

        store.reset(Document::new());
        assert!(changes.has_changed().unwrap());
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_edit_soon_after_save_is_adopted_once_window_passes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let mut store = store();
        store.save_as(&path).await.unwrap();
        let saved_at = store.last_save_at().unwrap();

        // The debounced notification for this write lands 702 ms after our save
        let mut external = Document::new();
        external.insert_link(NewLink::new("https://elsewhere"), chrono::Utc::now());
        write_doc(&path, &external);

        let delivered = saved_at + Duration::from_millis(702);
        let outcome = store
            .handle_watch_event(WatchEvent::at(WatchEventKind::Modified, &path, delivered))
            .await;
        assert_eq!(outcome, WatchOutcome::Reloaded);
        assert_eq!(store.value(), &external);
    }

    #[tokio::test]
    async fn test_real_watcher_adopts_edit_racing_own_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let options = StoreOptions {
            debounce: Duration::from_millis(400),
            self_write_window: Duration::from_millis(500),
        };
        let mut store = SyncedFile::new(Document::new(), options);
        store.load(&path).await.unwrap();
        store.start_watching().unwrap();

        store.mutate(|doc| doc.next_id());
        store.save().await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut external = Document::new();
        external.insert_link(NewLink::new("https://external"), chrono::Utc::now());
        write_doc(&path, &external);

        let reloaded = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = store.next_watch_event().await {
                if store.handle_watch_event(event).await == WatchOutcome::Reloaded {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap();

        assert!(reloaded);
        assert_eq!(store.value(), &external);
    }

    #[tokio::test]
    async fn test_real_watcher_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        let options = StoreOptions {
            debounce: Duration::from_millis(50),
            self_write_window: Duration::from_millis(100),
        };
        let mut store = SyncedFile::new(Document::new(), options);
        store.load(&path).await.unwrap();
        store.start_watching().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut external = Document::new();
        external.insert_link(NewLink::new("https://external"), chrono::Utc::now());
        write_doc(&path, &external);

        let reloaded = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = store.next_watch_event().await {
                if store.handle_watch_event(event).await == WatchOutcome::Reloaded {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap();

        assert!(reloaded);
        assert_eq!(store.value(), &external);
    }
}
