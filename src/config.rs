use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::app::StorageObject;
use crate::credentials::DEFAULT_SERVICE_NAME;
use crate::sftp::SftpSettings;

pub const CONFIG_VERSION: u32 = 1;

/// Overrides `base_url` when set.
pub const ENV_BASE_URL: &str = "NAVIGATE_BASE_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    /// Keyring service the username/API key are stored under.
    pub service_name: String,
    #[serde(default)]
    pub sftp: Option<SftpSettings>,
    pub log_dir: PathBuf,
    #[serde(default = "default_appointments_dir")]
    pub appointments_dir: PathBuf,
    pub version: Option<u32>,
}

fn default_appointments_dir() -> PathBuf {
    PathBuf::from(crate::appointments::DEFAULT_OUT_DIR)
}

impl Default for Config {
    fn default() -> Self {
        let log_dir = config_dir().map(|d| d.join("logs")).unwrap_or_else(|| PathBuf::from("logs"));
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            sftp: None,
            log_dir,
            appointments_dir: default_appointments_dir(),
            version: Some(CONFIG_VERSION),
        }
    }
}

/// `~/.navigate-connector`
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".".to_owned() + env!("CARGO_PKG_NAME")))
}

impl Config {
    pub fn default_path() -> anyhow::Result<PathBuf> {
        config_dir()
            .map(|d| d.join("config.json"))
            .context("cannot find the user's home directory")
    }

    /// Loads `path`, writing a default config first when it does not exist.
    pub fn init(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            Config::default()
                .save_to(path)
                .with_context(|| format!("cannot create config file {}", path.display()))?;
            tracing::info!("created default config at {}", path.display());
        }
        Ok(Config::load(path).with_env_overrides())
    }

    /// Reads `path`; a missing or unreadable file yields the defaults.
    pub fn load(path: &Path) -> Self {
        Config::read_from(path)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.save_to(path).with_context(|| format!("cannot write config file {}", path.display()))
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_BASE_URL)
            && !url.trim().is_empty()
        {
            self.base_url = url.trim().to_string();
        }
        self
    }

    pub fn log_file(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{}.log", name))
    }
}
