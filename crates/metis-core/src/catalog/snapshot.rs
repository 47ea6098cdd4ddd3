use tracing::warn;

use super::{Catalog, GenreHistory};
use crate::error::{MetisError, Result};
use crate::models::{BookEntry, EntryId, EntryRecord, Snapshot};

impl Catalog {
    /// Build a catalog from a snapshot, rebuilding every derived structure.
    ///
    /// Ids must be non-negative integers and display keys must be unique.
    /// `next_id` becomes one past the largest id, or 0 for an empty collection.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut catalog = Catalog::new();

        for (raw_id, record) in snapshot.collection {
            let id = parse_id(&raw_id)?;
            if let Some(uid) = record.uid {
                if uid != id {
                    return Err(reject(format!("entry {raw_id} carries mismatched uid {uid}")));
                }
            }
            if catalog.entries.contains_key(&id) {
                return Err(reject(format!("entry id {id} appears more than once")));
            }

            let entry = BookEntry::new(id, record.into())
                .map_err(|e| reject(format!("entry {id}: {e}")))?;
            let key = entry.lookup_key();
            if let Some(other) = catalog.key_index.insert(key, id) {
                return Err(reject(format!(
                    "entries {other} and {id} share the title '{}'",
                    entry.display_key()
                )));
            }

            catalog.known_genres.extend(entry.genre.iter().cloned());
            catalog.entries.insert(id, entry);
        }

        catalog.next_id = match catalog.entries.keys().max() {
            Some(&max) => max
                .checked_add(1)
                .ok_or_else(|| reject(format!("entry id {max} leaves no room for new entries")))?,
            None => 0,
        };
        catalog.genre_filter = snapshot.filter.into_iter().collect();
        catalog.recent_genres = GenreHistory::from_genres(snapshot.recently_read);
        catalog.refresh_available();

        Ok(catalog)
    }

    /// Replace the whole state with `snapshot`. On error the catalog is unchanged.
    ///
    /// The search text is cleared; it is not part of a snapshot.
    pub fn load(&mut self, snapshot: Snapshot) -> Result<()> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }

    /// Capture the collection, genre history and genre filter.
    pub fn serialize(&self) -> Snapshot {
        Snapshot {
            collection: self
                .entries
                .iter()
                .map(|(id, entry)| (id.to_string(), EntryRecord::from(entry)))
                .collect(),
            recently_read: self.recent_genres.to_vec(),
            filter: self.genre_filter.iter().cloned().collect(),
            ..Snapshot::default()
        }
    }
}

fn parse_id(raw: &str) -> Result<EntryId> {
    raw.trim()
        .parse()
        .map_err(|_| reject(format!("entry id '{raw}' is not a non-negative integer")))
}

fn reject(message: String) -> MetisError {
    warn!("{message}");
    MetisError::Snapshot(message)
}
