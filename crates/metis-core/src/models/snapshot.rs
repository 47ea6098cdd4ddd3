use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::{BookEntry, DEFAULT_AUTHOR, DEFAULT_DATE, DEFAULT_SUMMARY, EntryId, NewEntry};

/// Discriminator written at the top of every snapshot file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    #[default]
    ReadingList,
}

/// The persisted state of a reading list: collection, genre history and filter.
///
/// Keys the decoder does not know about are ignored, which lets files from the
/// older tool (with `__SaveFile__` / `__ReadingListItem__` markers) load as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub kind: SnapshotKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,

    /// Stringified id → entry.
    #[serde(default)]
    pub collection: BTreeMap<String, EntryRecord>,

    /// Genre history, least recent first.
    #[serde(default)]
    pub recently_read: Vec<String>,

    /// Active genre filter.
    #[serde(default)]
    pub filter: Vec<String>,
}

/// Serialized form of a [`BookEntry`]. The id lives in the collection key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub title: String,

    #[serde(default)]
    pub subtitle: Option<String>,

    #[serde(default = "default_author")]
    pub author: String,

    #[serde(default = "default_date")]
    pub date: String,

    #[serde(default = "default_summary")]
    pub summary: String,

    #[serde(default)]
    pub genre: Vec<String>,

    #[serde(default = "default_available")]
    pub available: bool,

    /// Legacy per-item id. Must agree with the collection key when present.
    #[serde(default, skip_serializing)]
    pub uid: Option<EntryId>,
}

impl From<&BookEntry> for EntryRecord {
    fn from(entry: &BookEntry) -> Self {
        Self {
            title: entry.title.clone(),
            subtitle: entry.subtitle.clone(),
            author: entry.author.clone(),
            date: entry.date.clone(),
            summary: entry.summary.clone(),
            genre: entry.genre.iter().cloned().collect(),
            available: entry.available,
            uid: None,
        }
    }
}

impl From<EntryRecord> for NewEntry {
    fn from(record: EntryRecord) -> Self {
        Self {
            title: record.title,
            subtitle: record.subtitle,
            author: Some(record.author),
            date: Some(record.date),
            summary: Some(record.summary),
            genre: record.genre.into_iter().collect(),
            available: record.available,
        }
    }
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

fn default_date() -> String {
    DEFAULT_DATE.to_string()
}

fn default_summary() -> String {
    DEFAULT_SUMMARY.to_string()
}

fn default_available() -> bool {
    true
}
