use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::NavigateClient;
use crate::config::Config;
use crate::credentials::CredentialManager;
use crate::error::NavigateError;
use crate::sftp::NavigateSftp;

/// Resolved configuration plus factories for the clients it describes.
pub struct App {
    config: Config,
    config_path: std::path::PathBuf,
}

impl App {
    pub fn new(config: Config, config_path: impl Into<std::path::PathBuf>) -> Self {
        Self { config, config_path: config_path.into() }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn credential_manager(&self) -> CredentialManager {
        CredentialManager::new(self.config.service_name.clone())
    }

    /// API client with keyring credentials, prompting when none are stored.
    pub fn api_client(&self) -> Result<NavigateClient, NavigateError> {
        NavigateClient::from_manager(self.config.base_url.clone(), &self.credential_manager())
    }

    /// Unconnected SFTP client built from the `sftp` config section.
    pub fn sftp_client(&self) -> Result<NavigateSftp, NavigateError> {
        let settings = self.config.sftp.clone().ok_or_else(|| {
            NavigateError::Config("no sftp section; run `navigate set --sftp user@host`".into())
        })?;
        Ok(NavigateSftp::new(settings))
    }
}

/// JSON file persistence for config-like values.
pub trait StorageObject {
    fn pretty_json(&self) -> String;
    fn save_to<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()>
    where
        Self: Serialize;
    fn read_from<T: Default + DeserializeOwned + Serialize, P: AsRef<Path>>(path: P) -> T;
}

impl<T: Serialize> StorageObject for T {
    fn pretty_json(&self) -> String {
        match serde_json::to_string_pretty(self) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("serialization failed: {}, writing empty object", e);
                "{}".to_string()
            }
        }
    }

    fn save_to<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.pretty_json())
    }

    fn read_from<R: Default + DeserializeOwned + Serialize, P: AsRef<Path>>(path: P) -> R {
        let v = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return R::default(),
        };
        match serde_json::from_str::<R>(&v) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("failed to parse JSON: {}, using defaults", e);
                R::default()
            }
        }
    }
}
