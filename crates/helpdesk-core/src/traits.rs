//! Core traits for helpdesk abstractions.
//!
//! Storage backends implement these so the HTTP layer can run against
//! PostgreSQL in production and an in-memory store in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// TICKET REPOSITORY
// =============================================================================

/// Filters for listing tickets. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTicketsRequest {
    /// Case-insensitive substring matched against title, description and
    /// github_url.
    pub q: Option<String>,
    /// Exact status match.
    pub status: Option<TicketStatus>,
    /// Exact department match.
    pub department: Option<String>,
}

impl ListTicketsRequest {
    /// Text query with blank input dropped.
    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.is_empty())
    }

    /// Department filter with blank input dropped.
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref().filter(|d| !d.is_empty())
    }

    /// Whether `ticket` satisfies every filter.
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if let Some(q) = self.query() {
            let needle = q.to_lowercase();
            let hit = |field: Option<&str>| {
                field.is_some_and(|value| value.to_lowercase().contains(&needle))
            };
            if !(hit(Some(ticket.title.as_str()))
                || hit(ticket.description.as_deref())
                || hit(ticket.github_url.as_deref()))
            {
                return false;
            }
        }
        if let Some(status) = self.status {
            if ticket.status != status {
                return false;
            }
        }
        if let Some(department) = self.department() {
            if ticket.department != department {
                return false;
            }
        }
        true
    }
}

/// Repository owning ticket records.
///
/// Implementations hold the attachment store handle they need for cleanup:
/// `update` with a new attachment and `delete` remove the previously
/// referenced file after the row change is committed. That removal is
/// best-effort and never fails the operation.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// List tickets matching `req`, newest first (ties in insertion order).
    async fn list(&self, req: ListTicketsRequest) -> Result<Vec<Ticket>>;

    /// Fetch one ticket.
    async fn get(&self, id: i64) -> Result<Ticket>;

    /// Insert a ticket referencing an already stored attachment, if any.
    async fn create(&self, req: CreateTicketRequest, attachment: Option<String>)
        -> Result<Ticket>;

    /// Apply a partial update; `Some(attachment)` replaces the stored file
    /// reference and schedules the old file for removal.
    async fn update(
        &self,
        id: i64,
        req: UpdateTicketRequest,
        attachment: Option<String>,
    ) -> Result<Ticket>;

    /// Delete a ticket and, best-effort, its attachment file.
    async fn delete(&self, id: i64) -> Result<()>;
}
