//! Bookmark document
//!
//! The whole dataset persisted in one JSON file: an id counter, the
//! collections and the links. Links and collections are kept newest-first.
//!
//! ## File format
//!
//! ```text
//! {
//!   "idCounter": 2,
//!   "collections": [],
//!   "links": [ { "id": 2, "url": "...", ... }, { "id": 1, ... } ]
//! }
//! ```
//!
//! Missing (or `null`) top-level keys default to empty/zero instead of failing,
//! so files written by older versions or by hand keep loading. Values that
//! are present are kept as stored; [`Document::validate`] reports a counter
//! that lags behind the ids.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Collection, EntryId, Link, NewCollection, NewLink};
use crate::value::StoreValue;

/// The bookmark dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawDocument")]
pub struct Document {
    /// Highest id ever assigned. Never decreases.
    pub id_counter: EntryId,
    pub collections: Vec<Collection>,
    pub links: Vec<Link>,
}

/// On-disk shape with every top-level key optional
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    #[serde(default)]
    id_counter: Option<EntryId>,
    #[serde(default)]
    collections: Option<Vec<Collection>>,
    #[serde(default)]
    links: Option<Vec<Link>>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        Document {
            id_counter: raw.id_counter.unwrap_or(0),
            collections: raw.collections.unwrap_or_default(),
            links: raw.links.unwrap_or_default(),
        }
    }
}

/// A structural problem found by [`Document::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentIssue {
    DuplicateLinkId(EntryId),
    DuplicateCollectionId(EntryId),
    IdAboveCounter(EntryId),
    /// A collection references a link id that no longer exists
    DanglingLink {
        collection: EntryId,
        link: EntryId,
    },
}

impl std::fmt::Display for DocumentIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentIssue::DuplicateLinkId(id) => write!(f, "duplicate link id {}", id),
            DocumentIssue::DuplicateCollectionId(id) => {
                write!(f, "duplicate collection id {}", id)
            }
            DocumentIssue::IdAboveCounter(id) => write!(f, "id {} is above idCounter", id),
            DocumentIssue::DanglingLink { collection, link } => {
                write!(f, "collection {} references missing link {}", collection, link)
            }
        }
    }
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize, defaulting missing top-level fields
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Pretty-printed JSON, two-space indent, trailing newline
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Advance the counter and return the new id
    pub fn next_id(&mut self) -> EntryId {
        self.id_counter += 1;
        self.id_counter
    }

    /// Highest id used by any link or collection
    pub fn max_id(&self) -> EntryId {
        self.links
            .iter()
            .map(|l| l.id)
            .chain(self.collections.iter().map(|c| c.id))
            .max()
            .unwrap_or(0)
    }

    /// Create a link and put it first
    pub fn insert_link(&mut self, draft: NewLink, now: DateTime<Utc>) -> Link {
        let id = self.next_id();
        let link = draft.into_link(id, now);
        self.links.insert(0, link.clone());
        link
    }

    /// Create a collection and put it first
    pub fn insert_collection(&mut self, draft: NewCollection, now: DateTime<Utc>) -> Collection {
        let id = self.next_id();
        let collection = draft.into_collection(id, now);
        self.collections.insert(0, collection.clone());
        collection
    }

    pub fn link(&self, id: EntryId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn link_mut(&mut self, id: EntryId) -> Option<&mut Link> {
        self.links.iter_mut().find(|l| l.id == id)
    }

    pub fn collection(&self, id: EntryId) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    pub fn collection_mut(&mut self, id: EntryId) -> Option<&mut Collection> {
        self.collections.iter_mut().find(|c| c.id == id)
    }

    /// Links ordered by descending id (most recently created first)
    pub fn sorted_links(&self) -> Vec<&Link> {
        let mut links: Vec<&Link> = self.links.iter().collect();
        links.sort_by(|a, b| b.id.cmp(&a.id));
        links
    }

    /// Report structural problems without changing anything
    pub fn validate(&self) -> Vec<DocumentIssue> {
        let mut issues = Vec::new();

        let mut link_ids = HashSet::new();
        for link in &self.links {
            if !link_ids.insert(link.id) {
                issues.push(DocumentIssue::DuplicateLinkId(link.id));
            }
            if link.id > self.id_counter {
                issues.push(DocumentIssue::IdAboveCounter(link.id));
            }
        }

        let mut collection_ids = HashSet::new();
        for collection in &self.collections {
            if !collection_ids.insert(collection.id) {
                issues.push(DocumentIssue::DuplicateCollectionId(collection.id));
            }
            if collection.id > self.id_counter {
                issues.push(DocumentIssue::IdAboveCounter(collection.id));
            }
            for link in &collection.links {
                if !link_ids.contains(link) {
                    issues.push(DocumentIssue::DanglingLink {
                        collection: collection.id,
                        link: *link,
                    });
                }
            }
        }

        issues
    }
}

impl StoreValue for Document {
    fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        Document::parse(bytes)
    }

    fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        self.to_json()
    }
}
