mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use metis_core::{
    AppConfig, BookEntry, Catalog, EntryId, EntryUpdate, ExitCode, MetisError, NewEntry,
    parse_genre_list,
};
use session::Session;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "metis",
    about = "Reading guide: keeps your reading list and picks what to read next",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting METIS_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Reading list to use instead of the most recently opened one.
    #[arg(long, global = true)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new, empty reading list at PATH.
    New {
        path: PathBuf,
        /// Overwrite PATH if it already exists.
        #[arg(long)]
        confirm: bool,
    },

    /// Open an existing reading list and make it the current one.
    Open { path: PathBuf },

    /// Write the current reading list to another file and switch to it.
    SaveAs { path: PathBuf },

    /// List entries passing the genre filter.
    List {
        /// Only show entries whose "Title (date) by author" contains this text.
        #[arg(long)]
        search: Option<String>,
        /// List every entry, ignoring the genre filter.
        #[arg(long, conflicts_with = "search")]
        all: bool,
        /// Hide entries already read.
        #[arg(long)]
        unread: bool,
    },

    /// Show one entry.
    Show { id: EntryId },

    /// Add a book.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        subtitle: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        summary: Option<String>,
        /// Genre, repeatable or comma-separated.
        #[arg(long, action = clap::ArgAction::Append)]
        genre: Vec<String>,
        /// Add it as already read.
        #[arg(long)]
        read: bool,
    },

    /// Change fields of a book, e.g. `--set author="Ursula K. Le Guin"`.
    Edit {
        id: EntryId,
        #[arg(long = "set", value_name = "FIELD=VALUE", action = clap::ArgAction::Append)]
        set: Vec<String>,
    },

    /// Delete a book.
    Delete {
        id: EntryId,
        #[arg(long)]
        confirm: bool,
    },

    /// Mark a book read / unread.
    Toggle { id: EntryId },

    /// Show or replace the genre filter.
    Filter {
        /// Genres to keep, repeatable or comma-separated.
        genres: Vec<String>,
        /// Remove the filter.
        #[arg(long, conflicts_with = "genres")]
        clear: bool,
    },

    /// Pick the next book to read and mark it read.
    Recommend {
        #[arg(long)]
        search: Option<String>,
    },

    /// Show reading progress.
    Stats,

    /// Suggest known genres containing TEXT.
    Genres { text: Option<String> },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    Show,
    /// Print the config file path.
    Path,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_env("METIS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("METIS_JSON").as_deref() == Ok("1");

    if let Err(err) = run(cli, json_output) {
        let code = err
            .downcast_ref::<MetisError>()
            .map_or(ExitCode::GeneralError, MetisError::exit_code);
        if json_output {
            let _ = print_json(&serde_json::json!({
                "status": "error",
                "error": error_kind(&err),
                "message": format!("{err:#}"),
            }));
        } else {
            eprintln!("Error: {err:#}");
        }
        std::process::exit(code as i32);
    }
}

fn run(cli: Cli, json_output: bool) -> Result<()> {
    let mut session = Session::open(AppConfig::config_path(), cli.file)?;

    match cli.command {
        Commands::New { path, confirm } => {
            if path.exists() && !confirm {
                let message = format!("{} exists; add --confirm to overwrite it.", path.display());
                confirm_required(&message, json_output);
            }
            session.switch_to(&path, Catalog::new())?;
            session.save()?;
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"file":path}}))?;
            } else {
                println!("Started a new reading list at {}", path.display());
            }
        }

        Commands::Open { path } => {
            let catalog = metis_core::storage::open_catalog(&path)?;
            session.switch_to(&path, catalog)?;
            print_stats(&session, json_output)?;
        }

        Commands::SaveAs { path } => {
            session.save_as(&path)?;
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"file":path}}))?;
            } else {
                println!("Saved {} entries to {}", session.catalog.len(), path.display());
            }
        }

        Commands::List {
            search,
            all,
            unread,
        } => {
            if let Some(text) = search {
                session.catalog.set_search_text(text);
            }
            let catalog = &session.catalog;
            let items = listed_entries(catalog, all, unread);

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "items": items,
                        "available": catalog.available_count(),
                        "visible": catalog.visible_count(),
                    }
                }))?;
            } else if items.is_empty() {
                println!("Nothing to show. Use `metis add` to add books.");
            } else {
                for entry in &items {
                    print_line(entry, session.config.display.show_summary);
                }
                println!();
                println!("{}", ratio_line(&session));
            }
        }

        Commands::Show { id } => {
            let entry = session
                .catalog
                .get(id)
                .ok_or(MetisError::NotFound(id))?;
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":entry}))?;
            } else {
                print_details(entry);
            }
        }

        Commands::Add { title, subtitle, author, date, summary, genre, read } => {
            let fields = NewEntry {
                subtitle,
                author,
                date,
                summary,
                genre: genre.iter().flat_map(|g| parse_genre_list(g)).collect(),
                available: !read,
                ..NewEntry::new(title)
            };
            let entry = session.catalog.insert(fields)?.clone();
            session.save()?;

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":entry}))?;
            } else {
                println!("Added: {} ({})", entry.display_key(), entry.id);
            }
        }

        Commands::Edit { id, set } => {
            let mut update = EntryUpdate::default();
            for pair in &set {
                update.set_pair(pair)?;
            }
            if update.is_empty() {
                return Err(MetisError::Validation(format!(
                    "nothing to change; pass --set FIELD=VALUE with FIELD one of {}",
                    EntryUpdate::FIELDS.join(", ")
                ))
                .into());
            }
            let entry = session.catalog.edit(id, update)?.clone();
            session.save()?;

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":entry}))?;
            } else {
                println!("Updated: {}", entry.display_key());
            }
        }

        Commands::Delete { id, confirm } => {
            if !confirm {
                confirm_required("Add --confirm to delete without prompt.", json_output);
            }
            let entry = session.catalog.delete(id)?;
            session.save()?;

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"deleted":entry}}))?;
            } else {
                println!("Deleted: {}", entry.display_key());
            }
        }

        Commands::Toggle { id } => {
            let available = session.catalog.toggle(id)?;
            session.save()?;

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"id":id,"available":available}}))?;
            } else {
                let state = if available { "unread" } else { "read" };
                println!("Marked {id} as {state}.");
            }
        }

        Commands::Filter { genres, clear } => {
            if clear || !genres.is_empty() {
                let filter = genres.iter().flat_map(|g| parse_genre_list(g));
                session.catalog.set_genre_filter(filter);
                session.save()?;
            }
            let filter = session.catalog.genre_filter();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {"filter": filter, "available": session.catalog.available_count()}
                }))?;
            } else if filter.is_empty() {
                println!("No genre filter.");
            } else {
                let names: Vec<&str> = filter.iter().map(String::as_str).collect();
                println!("Filter: {}", names.join(", "));
            }
        }

        Commands::Recommend { search } => {
            if let Some(text) = search {
                session.catalog.set_search_text(text);
            }
            let chosen = session.catalog.recommend();
            if chosen.is_some() {
                session.save()?;
            }

            match (chosen, json_output) {
                (Some(entry), true) => {
                    print_json(&serde_json::json!({"status":"ok","data":entry}))?;
                }
                (Some(entry), false) => {
                    println!("Next up:");
                    print_details(&entry);
                    println!();
                    println!("{}", ratio_line(&session));
                }
                (None, true) => {
                    print_json(&serde_json::json!({"status":"ok","data":null}))?;
                }
                (None, false) => println!("Nothing left to read. Add books or loosen the filter."),
            }
        }

        Commands::Stats => print_stats(&session, json_output)?,

        Commands::Genres { text } => {
            let suggestions = session
                .catalog
                .genre_suggestions(text.as_deref().unwrap_or(""), &Default::default());
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":suggestions}))?;
            } else if suggestions.is_empty() {
                println!("No matching genres.");
            } else {
                for genre in suggestions {
                    println!("  {genre}");
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":session.config}))?;
                } else {
                    println!("recent_file.path      = {}", session.config.recent_file.path);
                    println!("display.show_summary  = {}", session.config.display.show_summary);
                    println!("display.ratio_label   = {}", session.config.display.ratio_label);
                }
            }
            ConfigAction::Path => {
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":session.config_path()}))?;
                } else {
                    println!("{}", session.config_path().display());
                }
            }
        },
    }

    Ok(())
}

// ─── Output ──────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_line(entry: &BookEntry, show_summary: bool) {
    let mark = if entry.available { ' ' } else { 'x' };
    let genres: Vec<&str> = entry.genre.iter().map(String::as_str).collect();
    println!(
        "{id:>4}  [{mark}] {key:<50}  {genres}",
        id = entry.id,
        key = entry.display_key(),
        genres = genres.join(", "),
    );
    if show_summary {
        println!("        {}", entry.summary.trim());
    }
}

fn print_details(entry: &BookEntry) {
    println!("  {}", entry.title);
    if let Some(subtitle) = &entry.subtitle {
        println!("  {subtitle}");
    }
    println!("  by {} ({})", entry.author, entry.date);
    if !entry.genre.is_empty() {
        let genres: Vec<&str> = entry.genre.iter().map(String::as_str).collect();
        println!("  Genres: {}", genres.join(", "));
    }
    println!("  {}", entry.summary.trim());
}

fn ratio_line(session: &Session) -> String {
    format!(
        "{}: {} / {}",
        session.config.display.ratio_label,
        session.catalog.available_count(),
        session.catalog.visible_count()
    )
}

fn print_stats(session: &Session, json_output: bool) -> Result<()> {
    let catalog = &session.catalog;
    if json_output {
        return print_json(&serde_json::json!({
            "status": "ok",
            "data": {
                "file": session.file,
                "total": catalog.len(),
                "available": catalog.available_count(),
                "visible": catalog.visible_count(),
                "filter": catalog.genre_filter(),
                "recent_genres": catalog.recent_genres().to_vec(),
            }
        }));
    }

    match &session.file {
        Some(path) => println!("Reading list: {}", path.display()),
        None => println!("No reading list open."),
    }
    println!("Entries: {}", catalog.len());
    println!("{}", ratio_line(session));
    if !catalog.genre_filter().is_empty() {
        let names: Vec<&str> = catalog.genre_filter().iter().map(String::as_str).collect();
        println!("Filter: {}", names.join(", "));
    }
    if !catalog.recent_genres().is_empty() {
        println!("Recently read: {}", catalog.recent_genres().to_vec().join(", "));
    }
    Ok(())
}

fn confirm_required(message: &str, json_output: bool) -> ! {
    if json_output {
        let _ = print_json(&serde_json::json!({"status":"error","error":"confirm_required","message":message}));
    } else {
        eprintln!("{message}");
    }
    std::process::exit(ExitCode::ConfirmRequired as i32);
}

/// Entries for `list`: the visible ones, or every entry with `all`.
fn listed_entries(catalog: &Catalog, all: bool, unread: bool) -> Vec<&BookEntry> {
    let mut items = if all {
        let mut every: Vec<&BookEntry> = catalog.entries().collect();
        every.sort_by_cached_key(|e| (e.lookup_key(), e.id));
        every
    } else {
        catalog.visible_entries()
    };
    items.retain(|e| !unread || e.available);
    items
}

fn error_kind(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<MetisError>() {
        Some(MetisError::Validation(_)) => "validation",
        Some(MetisError::Duplicate(_)) => "duplicate",
        Some(MetisError::NotFound(_)) => "not_found",
        Some(MetisError::UnknownField(_)) => "unknown_field",
        Some(MetisError::Snapshot(_)) => "invalid_snapshot",
        Some(MetisError::TomlParse(_) | MetisError::TomlSerialize(_)) => "config",
        Some(MetisError::IdsExhausted) => "ids_exhausted",
        Some(MetisError::Io(_) | MetisError::Json(_)) => "io",
        None => "general",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_edit_pairs() {
        let cli = Cli::try_parse_from([
            "metis", "edit", "3", "--set", "author=Le Guin", "--set", "genre=Fantasy, Classic",
        ])
        .unwrap();
        match cli.command {
            Commands::Edit { id, set } => {
                assert_eq!(id, 3);
                assert_eq!(set, ["author=Le Guin", "genre=Fantasy, Classic"]);
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn test_filter_clear_conflicts_with_genres() {
        assert!(Cli::try_parse_from(["metis", "filter", "Fantasy", "--clear"]).is_err());
        assert!(Cli::try_parse_from(["metis", "filter", "--clear"]).is_ok());
    }

    #[test]
    fn test_list_all_ignores_genre_filter() {
        let mut catalog = Catalog::new();
        let hobbit = NewEntry {
            genre: ["Fantasy".to_string()].into(),
            ..NewEntry::new("The Hobbit")
        };
        catalog.insert(hobbit).unwrap();
        let dune = catalog.insert(NewEntry::new("Dune")).unwrap().id;
        catalog.toggle(dune).unwrap();
        catalog.set_genre_filter(["Fantasy".to_string()]);

        let titles = |items: Vec<&BookEntry>| -> Vec<String> {
            items.into_iter().map(|e| e.title.clone()).collect()
        };
        assert_eq!(titles(listed_entries(&catalog, false, false)), ["The Hobbit"]);
        assert_eq!(titles(listed_entries(&catalog, true, false)), ["Dune", "The Hobbit"]);
        assert_eq!(titles(listed_entries(&catalog, true, true)), ["The Hobbit"]);
    }

    #[test]
    fn test_list_all_conflicts_with_search() {
        let cli = Cli::try_parse_from(["metis", "list", "--all", "--unread"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::List {
                all: true,
                unread: true,
                search: None
            }
        ));
        assert!(Cli::try_parse_from(["metis", "list", "--all", "--search", "dune"]).is_err());
    }

    #[test]
    fn test_error_kind() {
        let err = anyhow::Error::from(MetisError::Duplicate("Dune".into()));
        assert_eq!(error_kind(&err), "duplicate");
        assert_eq!(error_kind(&anyhow::anyhow!("boom")), "general");
    }
}
