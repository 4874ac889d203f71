//! Linkbox Core Library
//!
//! This crate provides the core functionality for Linkbox, a bookmark
//! manager that keeps its links and collections in a single JSON file.
//!
//! # Architecture
//!
//! - **JSON file**: Source of truth for data, editable by hand or by other tools
//! - **SyncedFile**: In-memory copy that saves on request and reloads when
//!   the file changes underneath it
//!
//! All queries are served directly from the in-memory document.
//!
//! # Quick Start
//!
//! ```text
//! let mut library = Library::new(&Config::load()?);
//! library.init().await?;
//! library.open_path("links.json").await?;
//!
//! // Add a link
//! library.documents_mut().add_link(NewLink::new("https://example.com").title("Example"));
//! library.documents_mut().save().await?;
//!
//! // Query links
//! let links = library.documents().sorted_links();
//! ```
//!
//! # Modules
//!
//! - `store`: File-synchronized store (load, save, watch, self-write suppression)
//! - `bookmarks`: Link and collection operations on a document store
//! - `library`: Open/save flow tying the document to the settings file
//! - `models`: Data structures for links and collections
//! - `document`: The bookmark document and its file format
//! - `settings`: Persisted preferences
//! - `watch`: Filesystem change notifications
//! - `config`: Application configuration

pub mod bookmarks;
pub mod config;
pub mod document;
pub mod error;
pub mod fsio;
pub mod library;
pub mod models;
pub mod settings;
pub mod store;
pub mod value;
pub mod watch;

pub use bookmarks::DocumentStore;
pub use config::Config;
pub use document::{Document, DocumentIssue};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use library::{FilePicker, Library, LibraryEvent};
pub use models::{Collection, EntryId, Link, NewCollection, NewLink};
pub use settings::{Settings, SettingsStore};
pub use store::{LoadOutcome, StoreOptions, SyncedFile, WatchOutcome};
pub use value::StoreValue;
pub use watch::{NotifyWatchSource, WatchEvent, WatchEventKind, WatchSource, WatchSubscription};
