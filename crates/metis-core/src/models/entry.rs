use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{MetisError, Result};

/// Stable identifier of an entry within a catalog. Never reused.
pub type EntryId = u64;

pub const DEFAULT_AUTHOR: &str = "Anonymous";
pub const DEFAULT_DATE: &str = "n.d.";
pub const DEFAULT_SUMMARY: &str = "TBA";

/// One book on the reading list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookEntry {
    pub id: EntryId,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    pub author: String,
    pub date: String,
    pub summary: String,

    #[serde(default)]
    pub genre: BTreeSet<String>,

    /// Not yet read, eligible for recommendation.
    pub available: bool,
}

/// Fields for a new entry. Only the title is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub summary: Option<String>,
    pub genre: BTreeSet<String>,
    pub available: bool,
}

impl NewEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            author: None,
            date: None,
            summary: None,
            genre: BTreeSet::new(),
            available: true,
        }
    }
}

impl Default for NewEntry {
    fn default() -> Self {
        Self::new("")
    }
}

impl BookEntry {
    /// Build a validated entry. Fails if the title is blank once whitespace is collapsed.
    pub fn new(id: EntryId, fields: NewEntry) -> Result<Self> {
        Ok(Self {
            id,
            title: validate_title(&fields.title)?,
            subtitle: normalize_subtitle(fields.subtitle.as_deref()),
            author: or_default(fields.author.as_deref(), DEFAULT_AUTHOR),
            date: or_default(fields.date.as_deref(), DEFAULT_DATE),
            summary: or_default(fields.summary.as_deref(), DEFAULT_SUMMARY),
            genre: clean_genres(fields.genre),
            available: fields.available,
        })
    }

    /// `"{title} ({date}) by {author}"`.
    pub fn display_key(&self) -> String {
        format!("{} ({}) by {}", self.title, self.date, self.author)
    }

    /// Case-insensitive form of [`display_key`](Self::display_key), used for uniqueness.
    pub fn lookup_key(&self) -> String {
        self.display_key().to_lowercase()
    }

    /// Apply the provided fields, leaving the others untouched.
    ///
    /// The title is validated before anything is written, so a failed update
    /// leaves the entry as it was. Uniqueness is checked by the catalog.
    pub fn update(&mut self, update: EntryUpdate) -> Result<()> {
        let title = update.title.as_deref().map(validate_title).transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(subtitle) = update.subtitle {
            self.subtitle = normalize_subtitle(subtitle.as_deref());
        }
        if let Some(author) = update.author {
            self.author = or_default(Some(&author), DEFAULT_AUTHOR);
        }
        if let Some(date) = update.date {
            self.date = or_default(Some(&date), DEFAULT_DATE);
        }
        if let Some(summary) = update.summary {
            self.summary = or_default(Some(&summary), DEFAULT_SUMMARY);
        }
        if let Some(genre) = update.genre {
            self.genre = clean_genres(genre);
        }
        if let Some(available) = update.available {
            self.available = available;
        }
        Ok(())
    }

    pub fn has_any_genre(&self, genres: &BTreeSet<String>) -> bool {
        self.genre.iter().any(|g| genres.contains(g))
    }
}

/// A partial set of entry fields to overwrite. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub title: Option<String>,
    /// `Some(None)` clears the subtitle.
    pub subtitle: Option<Option<String>>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub summary: Option<String>,
    pub genre: Option<BTreeSet<String>>,
    pub available: Option<bool>,
}

impl EntryUpdate {
    /// Names accepted by [`set`](Self::set).
    pub const FIELDS: [&'static str; 7] = [
        "title", "subtitle", "author", "date", "summary", "genre", "available",
    ];

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set a field from its textual form, as typed by a user.
    ///
    /// `genre` takes a comma-separated list; `available` takes
    /// `true/false`, `yes/no` or `1/0`. An empty subtitle clears it.
    pub fn set(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "title" => self.title = Some(value.to_string()),
            "subtitle" => {
                self.subtitle = Some(Some(value.to_string()).filter(|s| !s.trim().is_empty()))
            }
            "author" => self.author = Some(value.to_string()),
            "date" => self.date = Some(value.to_string()),
            "summary" => self.summary = Some(value.to_string()),
            "genre" => self.genre = Some(parse_genre_list(value)),
            "available" => self.available = Some(parse_flag(value)?),
            other => return Err(MetisError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    /// Parse a `field=value` pair and [`set`](Self::set) it.
    pub fn set_pair(&mut self, pair: &str) -> Result<()> {
        let (field, value) = pair.split_once('=').ok_or_else(|| {
            MetisError::Validation(format!("expected field=value, got '{pair}'"))
        })?;
        self.set(field.trim(), value)
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical spelling for user-typed genres: collapsed whitespace, each word capitalized.
pub fn normalize_genre(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Split a comma-separated genre list, normalizing each item and dropping blanks.
pub fn parse_genre_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(normalize_genre)
        .filter(|g| !g.is_empty())
        .collect()
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(MetisError::Validation(format!(
            "expected true or false, got '{other}'"
        ))),
    }
}

fn validate_title(raw: &str) -> Result<String> {
    let title = normalize_title(raw);
    if title.is_empty() {
        return Err(MetisError::Validation("title must not be empty".to_string()));
    }
    Ok(title)
}

fn normalize_subtitle(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn or_default(raw: Option<&str>, default: &str) -> String {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

fn clean_genres(genres: BTreeSet<String>) -> BTreeSet<String> {
    genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect()
}
