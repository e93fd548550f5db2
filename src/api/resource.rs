use std::fmt;
use std::str::FromStr;

/// A Navigate REST collection or record, resolved against the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Alerts,
    Users,
    User(String),
    Notes,
    Reminders,
    Visits,
    Attendance,
    Assignments,
    AssignmentFeedback,
    Appointments,
    /// Any other `v3` endpoint, e.g. `"courses"` or `"terms/2024"`.
    Custom(String),
}

impl Resource {
    /// Collections that can be named on the command line.
    pub const NAMED: [Resource; 9] = [
        Resource::Alerts,
        Resource::Users,
        Resource::Notes,
        Resource::Reminders,
        Resource::Visits,
        Resource::Attendance,
        Resource::Assignments,
        Resource::AssignmentFeedback,
        Resource::Appointments,
    ];

    /// Path segments below the base URL. Appointments is the one collection
    /// served outside the `v3` prefix.
    pub fn segments(&self) -> Vec<String> {
        let v3 = |tail: &str| vec!["v3".to_string(), tail.to_string()];
        match self {
            Resource::Alerts => v3("alerts"),
            Resource::Users => v3("users"),
            Resource::User(id) => vec!["v3".into(), "users".into(), id.clone()],
            Resource::Notes => v3("notes"),
            Resource::Reminders => v3("reminders"),
            Resource::Visits => v3("visits"),
            Resource::Attendance => v3("enrollment_attendances"),
            Resource::Assignments => v3("assignments"),
            Resource::AssignmentFeedback => v3("enrollment_assignments"),
            Resource::Appointments => vec!["appointments".into()],
            Resource::Custom(endpoint) => std::iter::once("v3".to_string())
                .chain(endpoint.split('/').filter(|s| !s.is_empty()).map(str::to_string))
                .collect(),
        }
    }

    /// Display path, e.g. `/v3/alerts`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }

    /// Key under `data` holding the records of a collection response.
    pub fn collection_key(&self) -> Option<&'static str> {
        match self {
            Resource::Alerts => Some("alerts"),
            Resource::Users => Some("users"),
            Resource::Notes => Some("notes"),
            Resource::Reminders => Some("reminders"),
            Resource::Visits => Some("visits"),
            Resource::Attendance => Some("enrollment_attendances"),
            Resource::Assignments => Some("assignments"),
            Resource::AssignmentFeedback => Some("enrollment_assignments"),
            Resource::Appointments => Some("appointments"),
            Resource::User(_) | Resource::Custom(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Alerts => "alerts",
            Resource::Users => "users",
            Resource::User(_) => "user",
            Resource::Notes => "notes",
            Resource::Reminders => "reminders",
            Resource::Visits => "visits",
            Resource::Attendance => "attendance",
            Resource::Assignments => "assignments",
            Resource::AssignmentFeedback => "assignment-feedback",
            Resource::Appointments => "appointments",
            Resource::Custom(endpoint) => endpoint,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl FromStr for Resource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        Resource::NAMED.iter().find(|r| r.name() == key).cloned().ok_or_else(|| {
            let names: Vec<&str> = Resource::NAMED.iter().map(|r| r.name()).collect();
            anyhow::anyhow!("unknown resource '{}', expected one of: {}", s, names.join(", "))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_match_endpoints() {
        assert_eq!(Resource::Alerts.path(), "/v3/alerts");
        assert_eq!(Resource::Attendance.path(), "/v3/enrollment_attendances");
        assert_eq!(Resource::AssignmentFeedback.path(), "/v3/enrollment_assignments");
        assert_eq!(Resource::Appointments.path(), "/appointments");
        assert_eq!(Resource::User("42".into()).path(), "/v3/users/42");
    }

    #[test]
    fn custom_endpoint_strips_slashes() {
        assert_eq!(Resource::Custom("/courses/".into()).path(), "/v3/courses");
        assert_eq!(Resource::Custom("terms//2024".into()).path(), "/v3/terms/2024");
    }

    #[test]
    fn parses_cli_names() {
        assert_eq!("alerts".parse::<Resource>().unwrap(), Resource::Alerts);
        assert_eq!(
            "assignment_feedback".parse::<Resource>().unwrap(),
            Resource::AssignmentFeedback
        );
        assert!("students".parse::<Resource>().is_err());
    }
}
