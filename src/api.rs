//! Blocking client for the Navigate REST API.
//!
//! Every operation is a GET with HTTP basic auth (`username:api_key`) whose
//! keyword filters become query parameters; the JSON body is returned as-is.

mod query;
mod resource;

pub use query::Query;
pub use resource::Resource;

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::credentials::{CredentialManager, Credentials};
use crate::error::{ApiError, NavigateError};

pub const DEFAULT_BASE_URL: &str = "https://gsu.campus.eab.com/api";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in `ApiError::Status`.
const MAX_ERROR_BODY: usize = 512;

pub struct NavigateClient {
    base_url: String,
    credentials: Credentials,
    http: Client,
}

impl NavigateClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .user_agent(concat!("navigate-connector/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base_url: base_url.into(), credentials, http })
    }

    /// Loads (or prompts for) credentials and builds a client.
    pub fn from_manager(
        base_url: impl Into<String>,
        manager: &CredentialManager,
    ) -> Result<Self, NavigateError> {
        let credentials = manager.load_credentials()?;
        Ok(Self::new(base_url, credentials)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn get_alerts(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Alerts, query)
    }

    pub fn get_users(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Users, query)
    }

    /// Single user record; takes no filters.
    pub fn get_user_by_id(&self, user_id: &str) -> Result<Value, ApiError> {
        self.fetch(&Resource::User(user_id.to_string()), &Query::new())
    }

    pub fn get_notes(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Notes, query)
    }

    pub fn get_reminders(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Reminders, query)
    }

    /// Check-in visits.
    pub fn get_visits(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Visits, query)
    }

    /// Enrollment attendance.
    pub fn get_attendance(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Attendance, query)
    }

    pub fn get_assignments(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Assignments, query)
    }

    /// Enrollment assignments, i.e. feedback given on assignments.
    pub fn get_assignment_feedback(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::AssignmentFeedback, query)
    }

    /// Appointments; usually filtered by `begin_date`/`end_date` (mm/dd/yyyy).
    pub fn get_appointments(&self, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Appointments, query)
    }

    /// Any endpoint under `v3`.
    pub fn get_endpoint(&self, endpoint: &str, query: &Query) -> Result<Value, ApiError> {
        self.fetch(&Resource::Custom(endpoint.to_string()), query)
    }

    pub fn fetch(&self, resource: &Resource, query: &Query) -> Result<Value, ApiError> {
        if !self.credentials.is_complete() {
            return Err(ApiError::CredentialsNotLoaded);
        }
        let url = self.url_for(resource)?;
        debug!(url = %url, params = query.len(), "GET {}", resource);

        let response = self
            .http
            .get(url.clone())
            .basic_auth(&self.credentials.username, Some(self.credentials.api_key.as_str()))
            .query(query.pairs())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            warn!(url = %url, status = status.as_u16(), "request failed");
            return Err(ApiError::Status { status: status.as_u16(), url: url.to_string(), body });
        }

        let text = response.text()?;
        let value = serde_json::from_str::<Value>(&text)
            .map_err(|e| ApiError::Decode { url: url.to_string(), message: e.to_string() })?;
        info!(resource = resource.name(), bytes = text.len(), "fetched {}", resource);
        Ok(value)
    }

    /// Absolute URL of `resource`; path segments are percent-encoded.
    pub fn url_for(&self, resource: &Resource) -> Result<Url, ApiError> {
        let invalid = |message: String| ApiError::InvalidUrl { url: self.base_url.clone(), message };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        {
            let mut segments =
                url.path_segments_mut().map_err(|_| invalid("not a base URL".to_string()))?;
            segments.pop_if_empty();
            segments.extend(resource.segments());
        }
        Ok(url)
    }
}
