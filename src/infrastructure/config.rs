//! Configuration management

use crate::error::{NotePageError, Result};
use crate::infrastructure::EditorSession;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-user config directory
pub const APP_NAME: &str = "note-page-cli";

/// Overrides the directory holding config.toml
pub const CONFIG_DIR_ENV: &str = "NOTE_PAGE_CLI_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the service account JSON key
    #[serde(default)]
    pub account_key_file: String,
}

impl Config {
    /// The configured key file, or None when the setting is blank
    pub fn key_file(&self) -> Option<&Path> {
        let trimmed = self.account_key_file.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Path::new(trimmed))
        }
    }
}

/// On-disk location of the config file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by `<dir>/config.toml`
    pub fn new(dir: &Path) -> Self {
        ConfigStore {
            path: dir.join(CONFIG_FILE),
        }
    }

    /// Locate the config directory.
    /// First checks NOTE_PAGE_CLI_CONFIG_DIR, then falls back to the platform config dir.
    pub fn discover() -> Result<Self> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.trim().is_empty() {
                return Ok(ConfigStore::new(Path::new(&dir)));
            }
        }

        let base = dirs::config_dir().ok_or_else(|| {
            NotePageError::Config(format!(
                "could not determine the config directory; set {}",
                CONFIG_DIR_ENV
            ))
        })?;
        Ok(ConfigStore::new(&base.join(APP_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the config, writing an empty one first if none exists
    pub fn load(&self) -> Result<Config> {
        if !self.exists() {
            let config = Config::default();
            self.save(&config)?;
            tracing::info!(path = %self.path.display(), "created empty config");
            return Ok(config);
        }

        let contents = fs::read_to_string(&self.path)?;
        toml::from_str(&contents).map_err(|e| {
            NotePageError::Config(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.path, contents)?;

        Ok(())
    }

    /// Open the config file in the editor and wait for it to close
    pub fn edit(&self, editor: &EditorSession) -> Result<()> {
        if !self.exists() {
            self.save(&Config::default())?;
        }
        editor.open_and_wait(&self.path)
    }
}
