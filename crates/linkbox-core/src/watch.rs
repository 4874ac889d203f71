//! Filesystem watching for synchronized files
//!
//! A [`WatchSource`] turns a file path into a [`WatchSubscription`]: a stream of
//! coalesced [`WatchEvent`]s for that one file. The store decides what to do
//! with each event; this module only observes and classifies.
//!
//! The `notify` backend watches the file's parent directory (non-recursive)
//! and filters by file name, so the subscription survives the file being
//! replaced by rename. Raw events are handed to a tokio task that collapses
//! bursts into one event per debounce window and stamps it when the burst
//! closes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// A burst never waits longer than this many debounce windows
const MAX_BURST_WINDOWS: u32 = 4;

/// What happened to the watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Modified,
    Removed,
    Created,
    Renamed,
    /// Metadata-only changes, access, anything unclassified
    Other,
}

impl WatchEventKind {
    /// Map a notify event kind
    pub fn from_notify(kind: &EventKind) -> Self {
        match kind {
            EventKind::Modify(ModifyKind::Name(_)) => WatchEventKind::Renamed,
            EventKind::Modify(ModifyKind::Metadata(_)) => WatchEventKind::Other,
            EventKind::Modify(_) => WatchEventKind::Modified,
            EventKind::Remove(_) => WatchEventKind::Removed,
            EventKind::Create(_) => WatchEventKind::Created,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => WatchEventKind::Other,
        }
    }

    /// Only content changes and removals can require a reload
    pub fn triggers_reload(self) -> bool {
        matches!(self, WatchEventKind::Modified | WatchEventKind::Removed)
    }
}

/// A coalesced change notification for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
    /// When the coalesced notification was delivered
    pub received_at: Instant,
}

impl WatchEvent {
    /// An event that arrived just now
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            received_at: Instant::now(),
        }
    }

    /// An event with an explicit arrival time
    pub fn at(kind: WatchEventKind, path: impl Into<PathBuf>, received_at: Instant) -> Self {
        Self {
            kind,
            path: path.into(),
            received_at,
        }
    }
}

/// A live watch on one file
///
/// Dropping or cancelling the subscription stops the underlying watcher and
/// its coalescing task.
pub struct WatchSubscription {
    path: PathBuf,
    events: UnboundedReceiver<WatchEvent>,
    watcher: Option<RecommendedWatcher>,
    task: Option<JoinHandle<()>>,
}

impl WatchSubscription {
    /// A subscription fed by an arbitrary channel
    ///
    /// Used for tests and for hosts that bring their own change feed.
    pub fn from_channel(path: impl Into<PathBuf>, events: UnboundedReceiver<WatchEvent>) -> Self {
        Self {
            path: path.into(),
            events,
            watcher: None,
            task: None,
        }
    }

    /// The watched file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next event; `None` once the feed has closed
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_next(&mut self) -> Option<WatchEvent> {
        self.events.try_recv().ok()
    }

    /// Stop watching
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.watcher.take().is_some() {
            debug!("Stopped watching {:?}", self.path);
        }
        self.events.close();
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("path", &self.path)
            .field("native", &self.watcher.is_some())
            .finish()
    }
}

/// Something that can watch a file for changes
pub trait WatchSource: Send + Sync {
    /// Start watching `path`, coalescing bursts within `debounce`
    fn subscribe(&self, path: &Path, debounce: Duration) -> StoreResult<WatchSubscription>;
}

/// Watches through the platform's native notification API
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatchSource;

impl WatchSource for NotifyWatchSource {
    fn subscribe(&self, path: &Path, debounce: Duration) -> StoreResult<WatchSubscription> {
        let watch_error = |source: notify::Error| StoreError::Watch {
            path: path.to_path_buf(),
            source,
        };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| watch_error(notify::Error::generic(&e.to_string())))?;

        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| watch_error(notify::Error::generic("path has no file name")))?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = create_watcher(raw_tx, file_name).map_err(watch_error)?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(coalesce(raw_rx, tx, debounce, path.to_path_buf()));

        debug!("Watching {:?} (debounce {:?})", path, debounce);

        Ok(WatchSubscription {
            path: path.to_path_buf(),
            events: rx,
            watcher: Some(watcher),
            task: Some(task),
        })
    }
}

fn create_watcher(
    tx: UnboundedSender<WatchEventKind>,
    file_name: OsString,
) -> notify::Result<RecommendedWatcher> {
    notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
        Ok(event) => {
            let ours = event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()));
            if ours {
                let _ = tx.send(WatchEventKind::from_notify(&event.kind));
            }
        }
        Err(e) => warn!("Watch error: {}", e),
    })
}

/// Collapse raw events into one event per burst
///
/// A burst ends once `window` passes without a new raw event, or after
/// `MAX_BURST_WINDOWS` windows in total so a file written continuously
/// still produces notifications.
async fn coalesce(
    mut raw: UnboundedReceiver<WatchEventKind>,
    out: UnboundedSender<WatchEvent>,
    window: Duration,
    path: PathBuf,
) {
    while let Some(first) = raw.recv().await {
        let mut burst = vec![first];
        let hard_deadline = tokio::time::Instant::now() + window * MAX_BURST_WINDOWS;
        let mut closed = false;

        loop {
            let deadline = (tokio::time::Instant::now() + window).min(hard_deadline);
            match tokio::time::timeout_at(deadline, raw.recv()).await {
                Ok(Some(kind)) => burst.push(kind),
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        let event = merge_burst(&path, &burst, Instant::now());
        if out.send(event).is_err() || closed {
            break;
        }
    }
}

/// One event standing for a whole burst, delivered at `emitted_at`
///
/// The last content change or removal wins over create/rename/other noise.
fn merge_burst(path: &Path, burst: &[WatchEventKind], emitted_at: Instant) -> WatchEvent {
    let kind = burst
        .iter()
        .rev()
        .find(|kind| kind.triggers_reload())
        .or_else(|| burst.last())
        .copied()
        .unwrap_or(WatchEventKind::Other);

    WatchEvent::at(kind, path, emitted_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};
    use tempfile::TempDir;

    #[test]
    fn test_classify_notify_kinds() {
        let cases = [
            (
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                WatchEventKind::Modified,
            ),
            (EventKind::Modify(ModifyKind::Any), WatchEventKind::Modified),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                WatchEventKind::Renamed,
            ),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                WatchEventKind::Other,
            ),
            (EventKind::Remove(RemoveKind::File), WatchEventKind::Removed),
            (EventKind::Create(CreateKind::File), WatchEventKind::Created),
            (EventKind::Access(AccessKind::Any), WatchEventKind::Other),
        ];

        for (notify_kind, expected) in cases {
            assert_eq!(WatchEventKind::from_notify(&notify_kind), expected);
        }
    }

    #[test]
    fn test_triggers_reload() {
        assert!(WatchEventKind::Modified.triggers_reload());
        assert!(WatchEventKind::Removed.triggers_reload());
        assert!(!WatchEventKind::Created.triggers_reload());
        assert!(!WatchEventKind::Renamed.triggers_reload());
        assert!(!WatchEventKind::Other.triggers_reload());
    }

    #[test]
    fn test_merge_prefers_content_change() {
        let burst = [WatchEventKind::Modified, WatchEventKind::Other];

        let emitted = Instant::now() + Duration::from_millis(300);
        let event = merge_burst(Path::new("/data/links.json"), &burst, emitted);
        assert_eq!(event.kind, WatchEventKind::Modified);
        assert_eq!(event.received_at, emitted);
    }

    #[test]
    fn test_merge_without_content_change() {
        let now = Instant::now();
        let burst = [WatchEventKind::Created, WatchEventKind::Renamed];
        let event = merge_burst(Path::new("/data/links.json"), &burst, now);
        assert_eq!(event.kind, WatchEventKind::Renamed);
    }

    #[tokio::test]
    async fn test_coalesce_collapses_burst() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(coalesce(
            raw_rx,
            tx,
            Duration::from_millis(50),
            PathBuf::from("/data/links.json"),
        ));

        for _ in 0..5 {
            raw_tx.send(WatchEventKind::Modified).unwrap();
        }

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, WatchEventKind::Modified);
        assert_eq!(event.path, PathBuf::from("/data/links.json"));
        assert!(rx.try_recv().is_err());

        drop(raw_tx);
        task.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_coalesced_event_is_stamped_when_delivered() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let window = Duration::from_millis(50);
        tokio::spawn(coalesce(raw_rx, tx, window, PathBuf::from("/data/links.json")));

        let sent_at = Instant::now();
        raw_tx.send(WatchEventKind::Modified).unwrap();

        let event = rx.recv().await.unwrap();
        // Emitted only after a quiet window, stamped at that point
        assert!(event.received_at >= sent_at + window);
    }

    #[tokio::test]
    async fn test_channel_subscription() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = WatchSubscription::from_channel("/data/links.json", rx);
        assert_eq!(sub.path(), Path::new("/data/links.json"));
        assert!(sub.try_next().is_none());

        tx.send(WatchEvent::new(WatchEventKind::Removed, "/data/links.json"))
            .unwrap();
        let event = sub.next().await.unwrap();
        assert_eq!(event.kind, WatchEventKind::Removed);

        sub.cancel();
        assert!(tx
            .send(WatchEvent::new(WatchEventKind::Modified, "/data/links.json"))
            .is_err());
    }

    #[tokio::test]
    async fn test_notify_source_reports_external_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        std::fs::write(&path, b"{}").unwrap();

        let mut sub = NotifyWatchSource
            .subscribe(&path, Duration::from_millis(50))
            .unwrap();

        // Writes to other files in the directory are filtered out
        std::fs::write(temp_dir.path().join("other.json"), b"{}").unwrap();
        std::fs::write(&path, b"{\"links\": []}").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match sub.next().await {
                    Some(event) if event.kind.triggers_reload() => return Some(event),
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(event.path, path);
        assert_eq!(event.kind, WatchEventKind::Modified);
    }

    #[tokio::test]
    async fn test_notify_source_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope").join("links.json");

        let err = NotifyWatchSource
            .subscribe(&path, Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, StoreError::Watch { .. }));
    }
}
