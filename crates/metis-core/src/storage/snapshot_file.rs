use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::catalog::Catalog;
use crate::error::{MetisError, Result};
use crate::models::Snapshot;

/// Write a snapshot as pretty JSON, stamping `saved_at`. Parent directories are created.
pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let stamped = Snapshot {
        saved_at: Some(Utc::now()),
        ..snapshot.clone()
    };
    let json = serde_json::to_string_pretty(&stamped)?;
    fs::write(path, json)?;
    info!(path = %path.display(), entries = stamped.collection.len(), "saved reading list");
    Ok(())
}

/// Read a snapshot file. Malformed JSON is reported as a snapshot error.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| MetisError::Snapshot(format!("{}: {e}", path.display())))
}

/// Read a snapshot file and build a catalog from it.
pub fn open_catalog(path: &Path) -> Result<Catalog> {
    let catalog = Catalog::from_snapshot(load_snapshot(path)?)?;
    info!(path = %path.display(), entries = catalog.len(), "opened reading list");
    Ok(catalog)
}

pub fn save_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    save_snapshot(path, &catalog.serialize())
}
