use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::warn;

use metis_core::storage::{open_catalog, save_catalog};
use metis_core::{AppConfig, Catalog, MetisError};

/// One invocation's view of the world: the config, the open list and its path.
pub struct Session {
    pub config: AppConfig,
    config_path: PathBuf,
    pub file: Option<PathBuf>,
    pub catalog: Catalog,
}

impl Session {
    /// Open the list named by `--file`, or else the remembered recent file.
    ///
    /// A recent file that can no longer be read is forgotten and the session
    /// starts empty. An explicit `--file` that does not exist yet starts empty
    /// and is created on the first save; any other failure is an error.
    pub fn open(config_path: PathBuf, explicit: Option<PathBuf>) -> Result<Self> {
        let mut config = AppConfig::load_or_repair(&config_path)?;

        let (file, catalog) = match explicit {
            Some(path) => match open_catalog(&path) {
                Ok(catalog) => (Some(path), catalog),
                Err(MetisError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    (Some(path), Catalog::new())
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("cannot open {}", path.display()));
                }
            },
            None => match config.recent_file() {
                Some(path) => match open_catalog(&path) {
                    Ok(catalog) => (Some(path), catalog),
                    Err(e) => {
                        warn!(path = %path.display(), "recent reading list unavailable: {e}");
                        config.remember_file(None);
                        config.save_to(&config_path)?;
                        (None, Catalog::new())
                    }
                },
                None => (None, Catalog::new()),
            },
        };

        Ok(Self {
            config,
            config_path,
            file,
            catalog,
        })
    }

    /// Write the catalog back to the current file and remember it.
    pub fn save(&mut self) -> Result<PathBuf> {
        let Some(path) = self.file.clone() else {
            bail!("no reading list is open; run `metis new <path>` or pass --file");
        };
        self.save_as(&path)?;
        Ok(path)
    }

    /// Write the catalog to `path`, which becomes the current file.
    pub fn save_as(&mut self, path: &Path) -> Result<()> {
        save_catalog(path, &self.catalog)?;
        self.remember(path)
    }

    /// Replace the open list with `catalog` at `path` and remember it.
    pub fn switch_to(&mut self, path: &Path, catalog: Catalog) -> Result<()> {
        self.catalog = catalog;
        self.remember(path)
    }

    fn remember(&mut self, path: &Path) -> Result<()> {
        self.file = Some(path.to_path_buf());
        self.config.remember_file(Some(path));
        self.config.save_to(&self.config_path)?;
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
