use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/metis/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub recent_file: RecentFileConfig,
    pub display: DisplayConfig,
}

/// The reading list opened last, reopened on the next start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentFileConfig {
    /// Empty when no list has been opened yet.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_summary: bool,
    pub ratio_label: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_summary: false,
            ratio_label: "To read".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/metis/config.toml`
    pub fn config_path() -> PathBuf {
        // Allow override via env var
        if let Ok(path) = std::env::var("METIS_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("metis")
            .join("config.toml")
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Like [`load_from`](Self::load_from), but a corrupt file is replaced with defaults.
    pub fn load_or_repair(path: &Path) -> Result<Self> {
        match Self::load_from(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %path.display(), "config unreadable, rewriting defaults: {e}");
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
        }
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Recent file ───────────────────────────────────────

    pub fn recent_file(&self) -> Option<PathBuf> {
        let path = self.recent_file.path.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// Remember `path` as the list to reopen, or forget it with `None`.
    pub fn remember_file(&mut self, path: Option<&Path>) {
        self.recent_file.path = path
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert!(cfg.recent_file().is_none());
        assert_eq!(cfg.display.ratio_label, "To read");
        assert!(!cfg.display.show_summary);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.remember_file(Some(Path::new("/books/list.json")));
        cfg.display.show_summary = true;
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.recent_file(), Some(PathBuf::from("/books/list.json")));
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[recent_file]\npath = \"list.json\"\n").unwrap();

        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.recent_file(), Some(PathBuf::from("list.json")));
        assert_eq!(cfg.display, DisplayConfig::default());
    }

    #[test]
    fn test_corrupt_config_is_repaired() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "recent_file = [[[").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
        let cfg = AppConfig::load_or_repair(&path).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(AppConfig::load_from(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_forget_recent_file() {
        let mut cfg = AppConfig::default();
        cfg.remember_file(Some(Path::new("a.json")));
        cfg.remember_file(None);
        assert!(cfg.recent_file().is_none());
    }
}
