//! Link and collection operations on a document store
//!
//! Every operation edits the document through [`SyncedFile::mutate`], so
//! the store is marked dirty; saving is left to the caller.

use chrono::Utc;

use crate::document::Document;
use crate::models::{Collection, EntryId, Link, NewCollection, NewLink};
use crate::store::SyncedFile;

/// A synchronized bookmark document
pub type DocumentStore = SyncedFile<Document>;

impl SyncedFile<Document> {
    // ==================== Link Operations ====================

    /// Create a link with the next id, newest first
    pub fn add_link(&mut self, draft: NewLink) -> Link {
        self.mutate(|doc| doc.insert_link(draft, Utc::now()))
    }

    /// Replace the link with the same id, re-stamping `lastUpdated`
    ///
    /// Returns `false` (and changes nothing) when no such link exists.
    pub fn update_link(&mut self, updated: Link) -> bool {
        if self.value().link(updated.id).is_none() {
            return false;
        }
        self.mutate(|doc| {
            if let Some(slot) = doc.link_mut(updated.id) {
                *slot = Link {
                    last_updated: Utc::now(),
                    ..updated
                };
            }
        });
        true
    }

    /// Remove a link; returns whether it existed
    ///
    /// Collections that reference the id keep referencing it.
    pub fn delete_link(&mut self, id: EntryId) -> bool {
        self.mutate(|doc| {
            let before = doc.links.len();
            doc.links.retain(|l| l.id != id);
            doc.links.len() != before
        })
    }

    /// Links ordered by descending id, for display
    pub fn sorted_links(&self) -> Vec<&Link> {
        self.value().sorted_links()
    }

    pub fn link(&self, id: EntryId) -> Option<&Link> {
        self.value().link(id)
    }

    /// Links carrying `tag`, newest first
    pub fn links_with_tag(&self, tag: &str) -> Vec<&Link> {
        self.sorted_links()
            .into_iter()
            .filter(|l| l.has_tag(tag))
            .collect()
    }

    // ==================== Collection Operations ====================

    pub fn add_collection(&mut self, draft: NewCollection) -> Collection {
        self.mutate(|doc| doc.insert_collection(draft, Utc::now()))
    }

    /// Replace the collection with the same id; `false` if absent
    pub fn update_collection(&mut self, updated: Collection) -> bool {
        if self.value().collection(updated.id).is_none() {
            return false;
        }
        self.mutate(|doc| {
            if let Some(slot) = doc.collection_mut(updated.id) {
                *slot = Collection {
                    last_updated: Utc::now(),
                    ..updated
                };
            }
        });
        true
    }

    /// Remove a collection; its links are untouched
    pub fn delete_collection(&mut self, id: EntryId) -> bool {
        self.mutate(|doc| {
            let before = doc.collections.len();
            doc.collections.retain(|c| c.id != id);
            doc.collections.len() != before
        })
    }

    /// Append a link id to a collection
    ///
    /// The link is not required to exist. Returns `false` when the
    /// collection is missing or already holds the id.
    pub fn add_link_to_collection(&mut self, collection: EntryId, link: EntryId) -> bool {
        match self.value().collection(collection) {
            Some(c) if !c.links.contains(&link) => {}
            _ => return false,
        }
        self.mutate(|doc| {
            if let Some(c) = doc.collection_mut(collection) {
                c.links.push(link);
                c.last_updated = Utc::now();
            }
        });
        true
    }

    /// Drop a link id from a collection; `false` if it was not there
    pub fn remove_link_from_collection(&mut self, collection: EntryId, link: EntryId) -> bool {
        match self.value().collection(collection) {
            Some(c) if c.links.contains(&link) => {}
            _ => return false,
        }
        self.mutate(|doc| {
            if let Some(c) = doc.collection_mut(collection) {
                c.links.retain(|id| *id != link);
                c.last_updated = Utc::now();
            }
        });
        true
    }

    pub fn collection(&self, id: EntryId) -> Option<&Collection> {
        self.value().collection(id)
    }

    /// Resolve a collection's link ids, skipping ids that no longer exist
    pub fn collection_links(&self, id: EntryId) -> Vec<&Link> {
        let doc = self.value();
        doc.collection(id)
            .map(|c| c.links.iter().filter_map(|l| doc.link(*l)).collect())
            .unwrap_or_default()
    }
}
