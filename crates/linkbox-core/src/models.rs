//! Data models for linkbox
//!
//! Defines the entities stored in a bookmark document: Link and Collection,
//! plus the drafts callers fill in before the store assigns an id.
//! Field names are camelCase on disk to match files written by other tools.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Numeric id assigned by the document's id counter
pub type EntryId = u64;

/// A saved link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Unique identifier, never reused
    pub id: EntryId,
    /// The URL
    #[serde(default)]
    pub url: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Free-form note
    #[serde(default)]
    pub note: String,
    /// Tags, in the order the user entered them
    #[serde(default)]
    pub tags: Vec<String>,
    /// Set on every create and update
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl Link {
    /// Check whether the link carries a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add a tag if not already present
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        }
    }
}

/// Fields of a link before the store assigns `id` and `lastUpdated`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewLink {
    pub url: String,
    pub title: String,
    pub note: String,
    pub tags: Vec<String>,
}

impl NewLink {
    /// Start a draft with the URL; the title defaults to the URL
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            title: url.clone(),
            url,
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub(crate) fn into_link(self, id: EntryId, now: DateTime<Utc>) -> Link {
        Link {
            id,
            url: self.url,
            title: self.title,
            note: self.note,
            tags: self.tags,
            last_updated: now,
        }
    }
}

/// A named group of links
///
/// `links` holds ids only. Deleting a link does not remove it from the
/// collections that reference it, so ids here may dangle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: EntryId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub links: Vec<EntryId>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: DateTime<Utc>,
}

/// Fields of a collection before the store assigns `id` and `lastUpdated`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCollection {
    pub title: String,
    pub note: String,
    pub links: Vec<EntryId>,
}

impl NewCollection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_collection(self, id: EntryId, now: DateTime<Utc>) -> Collection {
        Collection {
            id,
            title: self.title,
            note: self.note,
            links: self.links,
            last_updated: now,
        }
    }
}

/// Read `lastUpdated` without failing the whole document
///
/// Accepts RFC 3339 strings, zone-less ISO strings (taken as UTC) and
/// epoch milliseconds. Null or anything unreadable becomes the epoch.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(&text)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Some(Value::Number(millis)) => millis
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };
    Ok(parsed.unwrap_or_default())
}
