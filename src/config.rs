//! TOML configuration
//!
//! Looked up at `--config` (which must exist) or at
//! `<config_dir>/scmsweep/scmsweep.toml` (optional). Every key has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scm::DEFAULT_TOOL_TIMEOUT;

const APP_DIR: &str = "scmsweep";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of all checkouts
    pub scm_root: PathBuf,
    /// Root of generated files (graphs, icons)
    pub web_files_root: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Limit for every external tool call
    pub tool_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR);
        Self {
            scm_root: base.join("scm"),
            web_files_root: base.join("web"),
            database: base.join("scmsweep.db"),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Default config file location, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("scmsweep.toml"))
    }

    /// Load `path`, or the default file when present, or the defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("The specified configuration file does not exist: {}", path.display());
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Error reading configuration file {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Error parsing configuration file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Where application icons are copied
    pub fn icons_dir(&self) -> PathBuf {
        self.web_files_root.join("icons").join("apps")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml("scm_root = \"/srv/scm\"\ntool_timeout_secs = 30\n").unwrap();
        assert_eq!(config.scm_root, PathBuf::from("/srv/scm"));
        assert_eq!(config.tool_timeout(), Duration::from_secs(30));
        assert_eq!(config.database, Config::default().database);
    }

    #[test]
    fn test_icons_dir() {
        let config = Config { web_files_root: PathBuf::from("/web"), ..Config::default() };
        assert_eq!(config.icons_dir(), PathBuf::from("/web/icons/apps"));
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/scmsweep.toml"))).await.is_err());
    }
}
