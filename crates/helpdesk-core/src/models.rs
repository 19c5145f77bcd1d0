//! Ticket data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Ticket priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Canonical text form, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(Error::Validation(format!("Invalid priority: {}", s))),
        }
    }
}

/// Ticket workflow status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Canonical text form, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let folded = s.trim().to_lowercase().replace(['_', '-'], " ");
        match folded.as_str() {
            "open" => Ok(Self::Open),
            "in progress" | "inprogress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(Error::Validation(format!("Invalid status: {}", s))),
        }
    }
}

// =============================================================================
// TICKET
// =============================================================================

/// A persisted support request.
///
/// Serializes to the wire shape
/// `{id, title, department, description, priority, status, created_at,
/// end_at, github_url, attachment}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub department: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub github_url: Option<String>,
    /// Stored name of the attachment file, if any.
    pub attachment: Option<String>,
}

impl Ticket {
    /// Apply a partial update in place. Fields left as `None` are kept.
    pub fn apply(&mut self, req: UpdateTicketRequest) {
        if let Some(title) = req.title {
            self.title = title;
        }
        if let Some(department) = req.department {
            self.department = department;
        }
        if let Some(description) = req.description {
            self.description = description;
        }
        if let Some(priority) = req.priority {
            self.priority = priority;
        }
        if let Some(status) = req.status {
            self.status = status;
        }
        if let Some(end_at) = req.end_at {
            self.end_at = end_at;
        }
        if let Some(github_url) = req.github_url {
            self.github_url = github_url;
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Fields for a new ticket. `id`, `status` and `created_at` are assigned
/// by the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTicketRequest {
    pub title: String,
    pub department: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub end_at: Option<DateTime<Utc>>,
    pub github_url: Option<String>,
}

impl CreateTicketRequest {
    /// Shorthand for a ticket with only the required fields.
    pub fn new(title: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            department: department.into(),
            ..Self::default()
        }
    }

    /// Reject empty (after trimming) title or department.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.department.trim().is_empty() {
            return Err(Error::Validation(
                "title and department required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update of a ticket.
///
/// `None` keeps the current value. For nullable columns the inner option
/// distinguishes "set" (`Some(Some(v))`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub department: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub status: Option<TicketStatus>,
    pub end_at: Option<Option<DateTime<Utc>>>,
    pub github_url: Option<Option<String>>,
}

impl UpdateTicketRequest {
    /// Reject a title or department that is supplied but empty.
    pub fn validate(&self) -> Result<()> {
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&self.title) || blank(&self.department) {
            return Err(Error::Validation(
                "title and department cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the request changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Map blank text to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
