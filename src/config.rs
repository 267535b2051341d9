//! Configuration file handling for finwatch.
//!
//! The configuration file is stored at `$FINWATCH_HOME/config.json` and holds the address of the
//! finance service, the user the dashboard is for, and the poll periods.

use crate::model::Username;
use crate::sync::Periods;
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "finwatch";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const REFRESH_INTERVAL_MS: u64 = 1000;
const ALERT_INTERVAL_MS: u64 = 5000;
const RECENT_TRANSACTIONS: usize = 10;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FINWATCH_HOME` and from there it loads `$FINWATCH_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    username: Username,
}

impl Config {
    /// Creates the data directory and an initial `config.json` file with default settings.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the data directory, e.g. `$HOME/finwatch`
    /// - `base_url` - The address of the finance service, e.g. `http://localhost:8000`
    /// - `username` - The user the dashboard shows data for
    ///
    /// # Errors
    /// - Returns an error if `base_url` is not a valid URL or if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>, base_url: &str, username: Username) -> Result<Self> {
        url::Url::parse(base_url).with_context(|| format!("Invalid base URL '{base_url}'"))?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the finwatch home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);
        if config_path.is_file() {
            bail!("A config file already exists at '{}'", config_path.display());
        }

        let config_file = ConfigFile {
            base_url: base_url.to_string(),
            username: username.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
            username,
        })
    }

    /// This will
    /// - validate that `finwatch_home` exists and that the config file exists
    /// - load and validate the config file
    /// - return the loaded configuration object
    pub async fn load(finwatch_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = finwatch_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Finwatch home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let username = Username::new(&config_file.username)
            .with_context(|| format!("Invalid username in '{}'", config_path.display()))?;

        Ok(Self {
            root,
            config_path,
            config_file,
            username,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn base_url(&self) -> &str {
        &self.config_file.base_url
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn periods(&self) -> Periods {
        Periods {
            refresh: Duration::from_millis(self.config_file.refresh_interval_ms),
            alert: Duration::from_millis(self.config_file.alert_interval_ms),
        }
    }

    /// How many transactions the dashboard lists.
    pub fn recent_transactions(&self) -> usize {
        self.config_file.recent_transactions
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "finwatch",
///   "config_version": 1,
///   "base_url": "http://localhost:8000",
///   "username": "user_good",
///   "refresh_interval_ms": 1000,
///   "alert_interval_ms": 5000,
///   "recent_transactions": 10
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "finwatch"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The address of the finance service
    base_url: String,

    /// The user whose data is shown
    username: String,

    #[serde(default = "default_refresh_interval_ms")]
    refresh_interval_ms: u64,

    #[serde(default = "default_alert_interval_ms")]
    alert_interval_ms: u64,

    #[serde(default = "default_recent_transactions")]
    recent_transactions: usize,
}

fn default_refresh_interval_ms() -> u64 {
    REFRESH_INTERVAL_MS
}

fn default_alert_interval_ms() -> u64 {
    ALERT_INTERVAL_MS
}

fn default_recent_transactions() -> usize {
    RECENT_TRANSACTIONS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            base_url: String::new(),
            username: String::new(),
            refresh_interval_ms: REFRESH_INTERVAL_MS,
            alert_interval_ms: ALERT_INTERVAL_MS,
            recent_transactions: RECENT_TRANSACTIONS,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or holds invalid settings.
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path).await?;

        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        ensure!(
            config.refresh_interval_ms > 0 && config.alert_interval_ms > 0,
            "Poll intervals in '{}' must be greater than zero",
            path.display()
        );
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user() -> Username {
        Username::new("user_good").unwrap()
    }

    #[tokio::test]
    async fn create_then_load() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("finwatch");
        let created = Config::create(&home, "http://localhost:8000", user())
            .await
            .unwrap();
        assert!(created.config_path().is_file());

        let loaded = Config::load(&home).await.unwrap();
        assert_eq!(loaded.base_url(), "http://localhost:8000");
        assert_eq!(loaded.username(), &user());
        assert_eq!(loaded.periods(), Periods::default());
        assert_eq!(loaded.recent_transactions(), 10);
    }

    #[tokio::test]
    async fn create_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), "http://localhost:8000", user())
            .await
            .unwrap();
        assert!(Config::create(dir.path(), "http://localhost:9000", user())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn create_rejects_bad_url() {
        let dir = TempDir::new().unwrap();
        assert!(Config::create(dir.path(), "not a url", user()).await.is_err());
    }

    #[tokio::test]
    async fn optional_fields_default() {
        let dir = TempDir::new().unwrap();
        let json = r#"{
            "app_name": "finwatch",
            "config_version": 1,
            "base_url": "http://localhost:8000",
            "username": "user_good",
            "refresh_interval_ms": 250
        }"#;
        std::fs::write(dir.path().join(CONFIG_JSON), json).unwrap();
        let config = Config::load(dir.path()).await.unwrap();
        assert_eq!(config.periods().refresh, Duration::from_millis(250));
        assert_eq!(config.periods().alert, Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn wrong_app_name_fails() {
        let dir = TempDir::new().unwrap();
        let json = r#"{"app_name": "tiller", "config_version": 1, "base_url": "", "username": "x"}"#;
        std::fs::write(dir.path().join(CONFIG_JSON), json).unwrap();
        assert!(Config::load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn missing_home_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(dir.path().join("nope")).await.is_err());
    }
}
