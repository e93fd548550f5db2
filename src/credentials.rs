//! Navigate credentials kept in the OS secret store.
//!
//! The username and API key live as two entries under one service name
//! (`NavigateService` unless configured otherwise). When either entry is
//! missing the operator is prompted and both are written back together.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::CredentialError;

pub const DEFAULT_SERVICE_NAME: &str = "NavigateService";

const ACCOUNT_USERNAME: &str = "username";
const ACCOUNT_API_KEY: &str = "api_key";

/// Username + API key pair used for HTTP basic auth.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub api_key: Zeroizing<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { username: username.into(), api_key: Zeroizing::new(api_key.into()) }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.api_key.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Backend holding secrets by account name.
pub trait SecretStore: Send + Sync {
    fn get(&self, account: &str) -> Result<Option<String>, CredentialError>;
    fn set(&self, account: &str, value: &str) -> Result<(), CredentialError>;
    /// Removing an absent entry succeeds.
    fn delete(&self, account: &str) -> Result<(), CredentialError>;
}

/// OS keyring: macOS Keychain, Windows Credential Manager, Linux keyutils.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, account).map_err(|e| store_err(account, e))
    }
}

fn store_err(account: &str, e: keyring::Error) -> CredentialError {
    CredentialError::Store { account: account.to_string(), message: e.to_string() }
}

impl SecretStore for KeyringStore {
    fn get(&self, account: &str) -> Result<Option<String>, CredentialError> {
        match self.entry(account)?.get_password() {
            Ok(v) => Ok(Some(v)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(store_err(account, e)),
        }
    }

    fn set(&self, account: &str, value: &str) -> Result<(), CredentialError> {
        self.entry(account)?.set_password(value).map_err(|e| store_err(account, e))
    }

    fn delete(&self, account: &str) -> Result<(), CredentialError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(store_err(account, e)),
        }
    }
}

/// Process-local store, used in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { entries: Mutex::new(map) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, account: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.lock().get(account).cloned())
    }

    fn set(&self, account: &str, value: &str) -> Result<(), CredentialError> {
        self.lock().insert(account.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, account: &str) -> Result<(), CredentialError> {
        self.lock().remove(account);
        Ok(())
    }
}

/// Interactive input source for credentials.
pub trait Prompter {
    fn prompt_line(&self, label: &str) -> io::Result<String>;
    /// Input must not be echoed.
    fn prompt_secret(&self, label: &str) -> io::Result<String>;
    fn notify(&self, message: &str);
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt_line(&self, label: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", label)?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }

    fn prompt_secret(&self, label: &str) -> io::Result<String> {
        rpassword::prompt_password(label)
    }

    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

pub struct CredentialManager {
    service_name: String,
    store: Box<dyn SecretStore>,
    prompter: Box<dyn Prompter>,
}

impl CredentialManager {
    /// Keyring-backed manager prompting on the terminal.
    pub fn new(service_name: impl Into<String>) -> Self {
        let service_name = service_name.into();
        let store = Box::new(KeyringStore::new(service_name.clone()));
        Self { service_name, store, prompter: Box::new(TerminalPrompter) }
    }

    pub fn with_backends(
        service_name: impl Into<String>,
        store: Box<dyn SecretStore>,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        Self { service_name: service_name.into(), store, prompter }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Reads the stored pair without prompting. A half-present pair is `None`.
    pub fn stored_credentials(&self) -> Result<Option<Credentials>, CredentialError> {
        let username = self.store.get(ACCOUNT_USERNAME)?;
        let api_key = self.store.get(ACCOUNT_API_KEY)?;
        match (username, api_key) {
            (Some(u), Some(k)) if !u.is_empty() && !k.is_empty() => {
                Ok(Some(Credentials::new(u, k)))
            }
            _ => Ok(None),
        }
    }

    /// Returns stored credentials, prompting for and storing a new pair when
    /// either entry is missing.
    pub fn load_credentials(&self) -> Result<Credentials, CredentialError> {
        if let Some(creds) = self.stored_credentials()? {
            debug!(service = %self.service_name, "loaded credentials from keyring");
            return Ok(creds);
        }
        self.prompter.notify("Navigate service credentials not found.");
        let creds = self.prompt_pair("Enter Navigate username: ", "Enter Navigate API key: ")?;
        self.store_pair(&creds)?;
        self.prompter.notify("Credentials stored successfully.");
        info!(service = %self.service_name, username = %creds.username, "stored new credentials");
        Ok(creds)
    }

    /// Always prompts and overwrites the stored pair.
    pub fn update_credentials(&self) -> Result<Credentials, CredentialError> {
        let creds =
            self.prompt_pair("Enter new Navigate username: ", "Enter new Navigate API key: ")?;
        self.store_pair(&creds)?;
        self.prompter.notify("Credentials updated successfully.");
        info!(service = %self.service_name, username = %creds.username, "updated credentials");
        Ok(creds)
    }

    pub fn clear_credentials(&self) -> Result<(), CredentialError> {
        self.store.delete(ACCOUNT_USERNAME)?;
        self.store.delete(ACCOUNT_API_KEY)?;
        info!(service = %self.service_name, "removed stored credentials");
        Ok(())
    }

    fn prompt_pair(&self, user_label: &str, key_label: &str) -> Result<Credentials, CredentialError> {
        let username = self.prompter.prompt_line(user_label)?.trim().to_string();
        if username.is_empty() {
            return Err(CredentialError::EmptyInput("username".into()));
        }
        let api_key = Zeroizing::new(self.prompter.prompt_secret(key_label)?);
        let api_key = api_key.trim_end_matches(['\r', '\n']);
        if api_key.is_empty() {
            return Err(CredentialError::EmptyInput("API key".into()));
        }
        Ok(Credentials::new(username, api_key))
    }

    fn store_pair(&self, creds: &Credentials) -> Result<(), CredentialError> {
        self.store.set(ACCOUNT_USERNAME, &creds.username)?;
        self.store.set(ACCOUNT_API_KEY, &creds.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let c = Credentials::new("jdoe", "s3cret");
        let s = format!("{:?}", c);
        assert!(s.contains("jdoe"));
        assert!(!s.contains("s3cret"));
    }

    #[test]
    fn memory_store_delete_missing_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("username").is_ok());
        store.set("username", "a").unwrap();
        assert_eq!(store.get("username").unwrap().as_deref(), Some("a"));
        store.delete("username").unwrap();
        assert!(store.get("username").unwrap().is_none());
    }

    #[test]
    fn incomplete_credentials() {
        assert!(!Credentials::new("", "k").is_complete());
        assert!(!Credentials::new("u", "").is_complete());
        assert!(Credentials::new("u", "k").is_complete());
    }
}
