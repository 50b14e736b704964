//! Configuration file support for the CLI.
//!
//! The file is TOML: an optional `database` path plus the `[query]` and
//! `[render]` tables of [`QuarryConfig`].
//!
//! ```toml
//! database = "wiki.db"
//!
//! [query]
//! default_limit = 50
//!
//! [render]
//! american_dates = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use quarry_common::QuarryConfig;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "quarry.toml";

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// SQLite database file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Query and rendering settings.
    #[serde(flatten)]
    pub quarry: QuarryConfig,
}

impl CliConfig {
    /// Loads and validates configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, else `quarry.toml` in the working directory
    /// if it exists, else the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        Ok(Self::default())
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks every setting.
    pub fn validate(&self) -> Result<()> {
        self.quarry
            .validate()
            .map_err(|e| anyhow!("invalid configuration: {e}"))
    }
}
