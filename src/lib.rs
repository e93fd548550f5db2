pub mod api;
pub mod app;
pub mod appointments;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod parse;
pub mod records;
pub mod sftp;
pub mod util;

pub use api::{NavigateClient, Query, Resource};
pub use credentials::{CredentialManager, Credentials};
pub use error::{ApiError, CredentialError, ExportError, NavigateError, SftpError};
pub use sftp::{NavigateSftp, SftpSettings};
