use rand::Rng;
use tracing::debug;

use super::Catalog;
use super::history::GenreBudget;
use crate::models::{BookEntry, EntryId};

impl Catalog {
    /// Pick the next book to read and mark it as read.
    ///
    /// See [`recommend_with`](Self::recommend_with).
    pub fn recommend(&mut self) -> Option<BookEntry> {
        self.recommend_with(&mut rand::thread_rng())
    }

    /// Pick the next book to read using `rng`, steering away from recent genres.
    ///
    /// Candidates are drawn uniformly from the available entries, with
    /// replacement. Each genre in the recent history gets a budget of blocking
    /// strikes, larger for more recent genres; a draw whose genres hit a budget
    /// with strikes left spends them and is rejected. The first draw that is not
    /// rejected wins. Every rejection spends at least one strike, so a call makes
    /// at most `total strikes + 1` draws.
    ///
    /// The winner is toggled to unavailable and its genres move to the newest end
    /// of the history. Returns `None` when nothing is available.
    pub fn recommend_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<BookEntry> {
        let population: Vec<&BookEntry> = self
            .available_ids
            .iter()
            .filter_map(|id| self.entries.get(id))
            .collect();
        if population.is_empty() {
            return None;
        }

        let mut budgets = self.recent_genres.budgets();
        let mut rejected = 0usize;
        let chosen: EntryId = loop {
            let candidate = population[rng.gen_range(0..population.len())];
            if !GenreBudget::charge(&mut budgets, &candidate.genre) {
                break candidate.id;
            }
            rejected += 1;
        };

        self.toggle(chosen).ok()?;
        let entry = self.entries.get(&chosen)?;
        self.recent_genres.record(&entry.genre);

        debug!(id = chosen, rejected, entry = %entry.display_key(), "recommended entry");
        Some(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::catalog::HISTORY_LEN;
    use crate::catalog::tests::{assert_consistent, book};
    use crate::models::{NewEntry, Snapshot};

    #[test]
    fn test_recommend_empty_catalog() {
        let mut catalog = Catalog::new();
        assert!(catalog.recommend().is_none());
        assert!(catalog.recent_genres().is_empty());
    }

    #[test]
    fn test_recommend_marks_entry_read() {
        let mut catalog = Catalog::new();
        let id = catalog
            .insert(book("Dune", "Herbert", "1965", &["scifi"]))
            .unwrap()
            .id;

        let chosen = catalog.recommend().unwrap();
        assert_eq!(chosen.id, id);
        assert!(!chosen.available);
        assert!(!catalog.get(id).unwrap().available);
        assert_eq!(catalog.available_count(), 0);
        assert_eq!(catalog.recent_genres().to_vec(), ["scifi"]);
        assert!(catalog.recommend().is_none());
    }

    #[test]
    fn test_second_recommend_returns_other_entry_of_same_genre() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut catalog = Catalog::new();
        let a = catalog.insert(book("Dune", "Herbert", "1965", &["scifi"])).unwrap().id;
        let b = catalog
            .insert(book("Solaris", "Lem", "1961", &["scifi"]))
            .unwrap()
            .id;

        let first = catalog.recommend_with(&mut rng).unwrap().id;
        let second = catalog.recommend_with(&mut rng).unwrap().id;

        let mut picked = [first, second];
        picked.sort_unstable();
        assert_eq!(picked, [a, b]);
        assert_eq!(catalog.available_count(), 0);
    }

    #[test]
    fn test_blocked_singleton_still_terminates() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "collection": {"0": {"title": "Dune", "genre": ["scifi"]}},
                "recently_read": ["scifi", "scifi", "scifi", "scifi", "scifi", "scifi", "scifi"],
                "filter": []
            }"#,
        )
        .unwrap();
        let mut catalog = Catalog::from_snapshot(snapshot).unwrap();

        let chosen = catalog.recommend_with(&mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(chosen.id, 0);
        assert_eq!(catalog.recent_genres().to_vec(), ["scifi"]);
    }

    #[test]
    fn test_recent_genres_are_avoided_while_budget_lasts() {
        // After a scifi pick the remaining scifi book is blocked for five draws,
        // so the fantasy book wins unless the scifi one is drawn six times running.
        let mut trials = 0;
        let mut fantasy_wins = 0;
        for seed in 0..200 {
            let mut catalog = Catalog::new();
            catalog.insert(book("Dune", "Herbert", "1965", &["scifi"])).unwrap();
            let earthsea = catalog
                .insert(book("A Wizard of Earthsea", "Le Guin", "1968", &["fantasy"]))
                .unwrap()
                .id;
            catalog.insert(book("Solaris", "Lem", "1961", &["scifi"])).unwrap();

            let mut rng = StdRng::seed_from_u64(seed);
            let first = catalog.recommend_with(&mut rng).unwrap();
            if first.genre.contains("fantasy") {
                continue;
            }
            trials += 1;
            if catalog.recommend_with(&mut rng).unwrap().id == earthsea {
                fantasy_wins += 1;
            }
        }
        assert!(trials > 0);
        assert!(fantasy_wins * 10 >= trials * 8, "{fantasy_wins}/{trials}");
    }

    #[test]
    fn test_genreless_entry_leaves_history_alone() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut catalog = Catalog::new();
        let dune = catalog.insert(book("Dune", "Herbert", "1965", &["scifi"])).unwrap().id;
        let bare = catalog.insert(NewEntry::new("Notebook")).unwrap().id;

        catalog.toggle(bare).unwrap();
        assert_eq!(catalog.recommend_with(&mut rng).unwrap().id, dune);
        assert_eq!(catalog.recent_genres().to_vec(), ["scifi"]);

        catalog.toggle(bare).unwrap();
        assert_eq!(catalog.recommend_with(&mut rng).unwrap().id, bare);
        assert_eq!(catalog.recent_genres().to_vec(), ["scifi"]);
    }

    #[test]
    fn test_recommend_drains_and_bounds_history() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut catalog = Catalog::new();
        for i in 0..40 {
            let genres = [format!("g{}", i % 9), format!("g{}", (i * 7) % 11)];
            let genres: Vec<&str> = genres.iter().map(String::as_str).collect();
            catalog
                .insert(book(&format!("Book {i}"), "Author", "2000", &genres))
                .unwrap();
        }

        let mut seen = Vec::new();
        while catalog.available_count() > 0 {
            let before = catalog.available_count();
            let chosen = catalog.recommend_with(&mut rng).unwrap();
            assert_eq!(catalog.available_count(), before - 1);
            assert!(!catalog.available_ids().contains(&chosen.id));
            assert!(catalog.recent_genres().len() <= HISTORY_LEN);
            assert!(chosen.genre.iter().all(|g| catalog.recent_genres().iter().any(|h| h == g)));
            seen.push(chosen.id);
            assert_consistent(&catalog);
        }

        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 40);
    }

    #[test]
    fn test_recommend_respects_filter() {
        let mut catalog = Catalog::new();
        catalog.insert(book("Dune", "Herbert", "1965", &["scifi"])).unwrap();
        let emma = catalog.insert(book("Emma", "Austen", "1815", &["romance"])).unwrap().id;
        catalog.set_genre_filter(["romance".to_string()]);

        let chosen = catalog.recommend_with(&mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(chosen.id, emma);
        assert!(catalog.recommend().is_none());
        assert_eq!(catalog.len(), 2);
    }
}
