//! Structured errors for credential, REST, SFTP and export operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, prompting for or storing credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("keyring backend error for account '{account}': {message}")]
    Store { account: String, message: String },

    #[error("no value entered for {0}")]
    EmptyInput(String),

    #[error("failed to read from terminal: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Errors raised by the Navigate REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("credentials are not loaded; run `navigate login` to store them")]
    CredentialsNotLoaded,

    #[error("invalid request url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    /// HTTP status code when the server answered with a non-success status.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether repeating the same request may succeed: connection problems,
    /// timeouts, throttling and server-side failures. Auth and validation
    /// failures are final.
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::CredentialsNotLoaded
            | ApiError::InvalidUrl { .. }
            | ApiError::Decode { .. } => false,
        }
    }
}

/// Errors raised by the SFTP channel.
#[derive(Debug, Error)]
pub enum SftpError {
    #[error("SFTP connection is not open; call connect() first")]
    NotConnected,

    #[error("private key not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    #[error("could not resolve address: {0}")]
    NoAddress(String),

    #[error("TCP connection to {addr} failed: {message}")]
    Connect { addr: String, message: String },

    #[error("could not create SSH session: {0}")]
    SessionCreateFailed(String),

    #[error("SSH handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("SSH authentication failed for {username}@{addr}")]
    AuthFailed { addr: String, username: String },

    #[error("could not open SFTP subsystem: {0}")]
    SubsystemFailed(String),

    #[error("failed to list {path}: {message}")]
    List { path: String, message: String },

    #[error("failed to download {remote} to {}: {message}", .local.display())]
    Download { remote: String, local: PathBuf, message: String },

    #[error("failed to upload {} to {remote}: {message}", .local.display())]
    Upload { local: PathBuf, remote: String, message: String },
}

impl SftpError {
    /// Transient network/session failures are retriable; missing keys,
    /// rejected authentication and usage errors are not.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SftpError::Connect { .. }
                | SftpError::SessionCreateFailed(_)
                | SftpError::HandshakeFailed(_)
                | SftpError::SubsystemFailed(_)
        )
    }
}

/// Errors raised while exporting records to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid date '{value}', expected mm/dd/yyyy")]
    InvalidDate { value: String },

    #[error("begin date {begin} must be before end date {end}")]
    InvalidRange { begin: String, end: String },

    #[error("failed to write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

/// Crate-level error unifying every module's failures.
#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("SFTP error: {0}")]
    Sftp(#[from] SftpError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CredentialError {
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CredentialError::Store { .. } => {
                Some("the OS keyring is unavailable; check that a secret service is running")
            }
            _ => None,
        }
    }
}

impl ApiError {
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ApiError::CredentialsNotLoaded => {
                Some("run `navigate login` to store a username and API key")
            }
            ApiError::Status { status: 401, .. } => {
                Some("the stored API key was rejected; run `navigate login` to replace it")
            }
            _ => None,
        }
    }
}

impl SftpError {
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SftpError::KeyNotFound(_) => Some("set the key with `navigate set --sftp-key <path>`"),
            SftpError::AuthFailed { .. } => {
                Some("check that the public key is registered for this SFTP account")
            }
            _ => None,
        }
    }
}

impl NavigateError {
    /// Short hint printed by the CLI next to the error.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            NavigateError::Credentials(e) => e.hint(),
            NavigateError::Api(e) => e.hint(),
            NavigateError::Sftp(e) => e.hint(),
            NavigateError::Config(_) => Some("check `navigate config` for the sftp section"),
            NavigateError::Export(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_classify_retries() {
        let throttled =
            ApiError::Status { status: 429, url: "u".into(), body: String::new() };
        assert!(throttled.is_retriable());
        assert_eq!(throttled.status(), Some(429));

        let unavailable =
            ApiError::Status { status: 503, url: "u".into(), body: String::new() };
        assert!(unavailable.is_retriable());

        let forbidden = ApiError::Status { status: 403, url: "u".into(), body: String::new() };
        assert!(!forbidden.is_retriable());
        assert!(!ApiError::CredentialsNotLoaded.is_retriable());
    }

    #[test]
    fn sftp_auth_failures_are_final() {
        let auth = SftpError::AuthFailed { addr: "h:22".into(), username: "u".into() };
        assert!(!auth.is_retriable());
        assert!(SftpError::HandshakeFailed("h:22".into()).is_retriable());
        assert!(!SftpError::KeyNotFound(PathBuf::from("/nope")).is_retriable());
    }

    #[test]
    fn unauthorized_status_has_login_hint() {
        let err: NavigateError =
            ApiError::Status { status: 401, url: "u".into(), body: String::new() }.into();
        assert!(err.hint().unwrap_or_default().contains("navigate login"));
        let other: NavigateError = ExportError::InvalidDate { value: "x".into() }.into();
        assert!(other.hint().is_none());
    }

    #[test]
    fn display_includes_paths() {
        let err = SftpError::Download {
            remote: "/out/a.csv".into(),
            local: PathBuf::from("a.csv"),
            message: "eof".into(),
        };
        let s = err.to_string();
        assert!(s.contains("/out/a.csv") && s.contains("a.csv") && s.contains("eof"));
    }
}
