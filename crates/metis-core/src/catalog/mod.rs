//! The reading-list catalog.
//!
//! [`Catalog`] owns every entry and keeps the derived views in step with them:
//! the display-key index, the set of ids eligible for recommendation, the
//! genres seen so far and the recent-genre history. All mutations check for
//! failure before touching any of these, so an error leaves the catalog as it was.

mod history;
mod recommend;
mod snapshot;

pub use history::{GenreBudget, GenreHistory, HISTORY_LEN, STRIKES_PER_STEP};

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::{MetisError, Result};
use crate::models::{BookEntry, EntryId, EntryUpdate, NewEntry};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<EntryId, BookEntry>,
    /// Lowercase display key → id.
    key_index: HashMap<String, EntryId>,
    /// Ids that are both marked available and visible under the current filters.
    available_ids: BTreeSet<EntryId>,
    genre_filter: BTreeSet<String>,
    search_text: String,
    /// Every genre attached to an entry so far. Not pruned on delete.
    known_genres: BTreeSet<String>,
    recent_genres: GenreHistory,
    next_id: EntryId,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Queries ───────────────────────────────────────────

    /// Marked available and visible under the active filters.
    pub fn is_available(&self, entry: &BookEntry) -> bool {
        entry.available && self.is_visible(entry)
    }

    /// Passes the genre filter and the search text, regardless of availability.
    pub fn is_visible(&self, entry: &BookEntry) -> bool {
        if !self.genre_filter.is_empty() && !entry.has_any_genre(&self.genre_filter) {
            return false;
        }
        self.search_text.is_empty()
            || entry
                .lookup_key()
                .contains(&self.search_text.to_lowercase())
    }

    pub fn available_count(&self) -> usize {
        self.available_ids.len()
    }

    pub fn visible_count(&self) -> usize {
        self.entries.values().filter(|e| self.is_visible(e)).count()
    }

    pub fn get(&self, id: EntryId) -> Option<&BookEntry> {
        self.entries.get(&id)
    }

    /// Look an entry up by its display key, ignoring case.
    pub fn find_by_key(&self, display_key: &str) -> Option<&BookEntry> {
        self.key_index
            .get(&display_key.to_lowercase())
            .and_then(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &BookEntry> {
        self.entries.values()
    }

    /// Entries passing the active filters, ordered by display key.
    pub fn visible_entries(&self) -> Vec<&BookEntry> {
        let mut visible: Vec<&BookEntry> = self
            .entries
            .values()
            .filter(|e| self.is_visible(e))
            .collect();
        visible.sort_by_cached_key(|e| (e.lookup_key(), e.id));
        visible
    }

    pub fn available_ids(&self) -> &BTreeSet<EntryId> {
        &self.available_ids
    }

    pub fn genre_filter(&self) -> &BTreeSet<String> {
        &self.genre_filter
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn known_genres(&self) -> &BTreeSet<String> {
        &self.known_genres
    }

    pub fn recent_genres(&self) -> &GenreHistory {
        &self.recent_genres
    }

    pub fn next_id(&self) -> EntryId {
        self.next_id
    }

    /// Known genres containing `text` (case-insensitive), sorted, minus `exclude`.
    pub fn genre_suggestions(&self, text: &str, exclude: &BTreeSet<String>) -> Vec<&str> {
        let needle = text.trim().to_lowercase();
        self.known_genres
            .iter()
            .filter(|g| !exclude.contains(*g))
            .filter(|g| g.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    // ─── Mutations ─────────────────────────────────────────

    /// Add a new entry. The id is consumed even if the insert fails.
    pub fn insert(&mut self, fields: NewEntry) -> Result<&BookEntry> {
        let id = self.allocate_id()?;
        let entry = BookEntry::new(id, fields)?;

        let key = entry.lookup_key();
        if self.key_index.contains_key(&key) {
            return Err(MetisError::Duplicate(entry.display_key()));
        }

        self.known_genres.extend(entry.genre.iter().cloned());
        if self.is_available(&entry) {
            self.available_ids.insert(id);
        }
        self.key_index.insert(key, id);

        debug!(id, entry = %entry.display_key(), "inserted entry");
        self.entries.insert(id, entry);
        self.entries.get(&id).ok_or(MetisError::NotFound(id))
    }

    /// Overwrite the given fields of an existing entry.
    ///
    /// A change of the `available` flag goes through [`toggle`](Self::toggle)
    /// before the entry is re-keyed, and the id's availability is reconciled
    /// against the edited entry afterwards.
    pub fn edit(&mut self, id: EntryId, update: EntryUpdate) -> Result<&BookEntry> {
        let existing = self.entries.get(&id).ok_or(MetisError::NotFound(id))?;

        let mut candidate = existing.clone();
        candidate.update(update)?;

        let old_key = existing.lookup_key();
        let new_key = candidate.lookup_key();
        if self.key_index.get(&new_key).is_some_and(|&other| other != id) {
            return Err(MetisError::Duplicate(candidate.display_key()));
        }

        if candidate.available != existing.available {
            self.toggle(id)?;
        }

        self.key_index.remove(&old_key);
        self.key_index.insert(new_key, id);
        self.known_genres.extend(candidate.genre.iter().cloned());

        if let Some(slot) = self.entries.get_mut(&id) {
            *slot = candidate;
        }
        self.sync_availability(id);

        debug!(id, "edited entry");
        self.entries.get(&id).ok_or(MetisError::NotFound(id))
    }

    /// Remove an entry and return it.
    ///
    /// The id leaves the availability set only if the entry was marked
    /// available; visibility is not consulted.
    pub fn delete(&mut self, id: EntryId) -> Result<BookEntry> {
        let key = self
            .entries
            .get(&id)
            .map(BookEntry::lookup_key)
            .ok_or(MetisError::NotFound(id))?;
        if self.key_index.get(&key) != Some(&id) {
            return Err(MetisError::NotFound(id));
        }

        let entry = self.entries.remove(&id).ok_or(MetisError::NotFound(id))?;
        self.key_index.remove(&key);
        if entry.available {
            self.available_ids.remove(&id);
        }

        debug!(id, entry = %entry.display_key(), "deleted entry");
        Ok(entry)
    }

    /// Flip the `available` flag. Returns the new value.
    pub fn toggle(&mut self, id: EntryId) -> Result<bool> {
        let entry = self.entries.get_mut(&id).ok_or(MetisError::NotFound(id))?;
        entry.available = !entry.available;
        let available = entry.available;

        self.sync_availability(id);
        debug!(id, available, "toggled entry");
        Ok(available)
    }

    /// Replace the genre filter. An empty set lifts the restriction.
    pub fn set_genre_filter(&mut self, genres: impl IntoIterator<Item = String>) {
        self.genre_filter = genres.into_iter().collect();
        self.refresh_available();
    }

    /// Replace the search text. An empty string lifts the restriction.
    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.refresh_available();
    }

    fn allocate_id(&mut self) -> Result<EntryId> {
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(MetisError::IdsExhausted)?;
        Ok(id)
    }

    fn sync_availability(&mut self, id: EntryId) {
        let available = self.entries.get(&id).is_some_and(|e| self.is_available(e));
        if available {
            self.available_ids.insert(id);
        } else {
            self.available_ids.remove(&id);
        }
    }

    fn refresh_available(&mut self) {
        let ids: BTreeSet<EntryId> = self
            .entries
            .values()
            .filter(|e| self.is_available(e))
            .map(|e| e.id)
            .collect();
        self.available_ids = ids;
    }
}
