use std::collections::{BTreeSet, VecDeque};

/// Maximum number of genres remembered.
pub const HISTORY_LEN: usize = 7;

/// Blocking strikes per history position; position `i` (least recent first) gets `(i + 1)` times this.
pub const STRIKES_PER_STEP: u32 = 5;

/// Ordered record of genres from recently recommended entries, most recent last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreHistory {
    genres: VecDeque<String>,
}

/// Remaining number of draws a recent genre may still block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreBudget {
    pub genre: String,
    pub strikes: u32,
}

impl GenreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history from a stored list (least recent first), keeping the newest entries.
    pub fn from_genres(genres: impl IntoIterator<Item = String>) -> Self {
        let mut history = Self {
            genres: genres.into_iter().collect(),
        };
        history.trim();
        history
    }

    /// Move the given genres to the most-recent end, then cap the length.
    pub fn record<'a>(&mut self, genres: impl IntoIterator<Item = &'a String>) {
        for genre in genres {
            self.genres.retain(|seen| seen != genre);
            self.genres.push_back(genre.clone());
        }
        self.trim();
    }

    /// Blocking budgets for one recommendation pass; newer genres get more strikes.
    pub fn budgets(&self) -> Vec<GenreBudget> {
        self.genres
            .iter()
            .zip(1u32..)
            .map(|(genre, step)| GenreBudget {
                genre: genre.clone(),
                strikes: STRIKES_PER_STEP * step,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.genres.iter()
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.genres.iter().cloned().collect()
    }

    fn trim(&mut self) {
        while self.genres.len() > HISTORY_LEN {
            self.genres.pop_front();
        }
    }
}

impl GenreBudget {
    /// Charge every live budget matching one of `genres`. Returns whether any did.
    ///
    /// All matches are charged, even after the first one already blocked the draw.
    pub fn charge(budgets: &mut [GenreBudget], genres: &BTreeSet<String>) -> bool {
        let mut blocked = false;
        for genre in genres {
            for budget in budgets.iter_mut() {
                if budget.strikes > 0 && budget.genre == *genre {
                    budget.strikes -= 1;
                    blocked = true;
                }
            }
        }
        blocked
    }
}
