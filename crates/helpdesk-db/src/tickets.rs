//! PostgreSQL ticket repository.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, info};

use helpdesk_core::{
    CreateTicketRequest, Error, ListTicketsRequest, Result, Ticket, TicketRepository,
    UpdateTicketRequest,
};

use crate::attachments::AttachmentStore;
use crate::escape_like;

/// Column list shared by every query returning a full ticket.
const TICKET_COLUMNS: &str = "id, title, department, description, priority, status, \
                              created_at, end_at, github_url, attachment";

/// PostgreSQL implementation of TicketRepository.
pub struct PgTicketRepository {
    pool: PgPool,
    attachments: AttachmentStore,
}

impl PgTicketRepository {
    /// Create a repository over `pool`, cleaning up files through `attachments`.
    pub fn new(pool: PgPool, attachments: AttachmentStore) -> Self {
        Self { pool, attachments }
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn list(&self, req: ListTicketsRequest) -> Result<Vec<Ticket>> {
        let start = Instant::now();
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM ticket WHERE TRUE",
            TICKET_COLUMNS
        ));

        if let Some(q) = req.query() {
            let pattern = format!("%{}%", escape_like(q));
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR github_url ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = req.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(department) = req.department() {
            qb.push(" AND department = ").push_bind(department.to_string());
        }
        qb.push(" ORDER BY created_at DESC, id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let tickets = rows
            .iter()
            .map(ticket_from_row)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            subsystem = "db",
            component = "pg_tickets",
            op = "list",
            query = req.query().unwrap_or(""),
            result_count = tickets.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed tickets"
        );
        Ok(tickets)
    }

    async fn get(&self, id: i64) -> Result<Ticket> {
        let row = sqlx::query(&format!("SELECT {} FROM ticket WHERE id = $1", TICKET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::TicketNotFound(id))?;
        ticket_from_row(&row)
    }

    async fn create(
        &self,
        req: CreateTicketRequest,
        attachment: Option<String>,
    ) -> Result<Ticket> {
        req.validate()?;

        let row = sqlx::query(&format!(
            r#"INSERT INTO ticket
               (title, department, description, priority, status, end_at, github_url, attachment)
               VALUES ($1, $2, $3, $4, 'Open', $5, $6, $7)
               RETURNING {}"#,
            TICKET_COLUMNS
        ))
        .bind(&req.title)
        .bind(&req.department)
        .bind(&req.description)
        .bind(req.priority.as_str())
        .bind(req.end_at)
        .bind(&req.github_url)
        .bind(&attachment)
        .fetch_one(&self.pool)
        .await?;

        let ticket = ticket_from_row(&row)?;
        info!(
            subsystem = "db",
            component = "pg_tickets",
            op = "create",
            ticket_id = ticket.id,
            has_attachment = ticket.attachment.is_some(),
            "Ticket created"
        );
        Ok(ticket)
    }

    async fn update(
        &self,
        id: i64,
        req: UpdateTicketRequest,
        attachment: Option<String>,
    ) -> Result<Ticket> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query(&format!(
            "SELECT {} FROM ticket WHERE id = $1 FOR UPDATE",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::TicketNotFound(id))?;
        let current = ticket_from_row(&current)?;

        if req.is_empty() && attachment.is_none() {
            tx.commit().await?;
            return Ok(current);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ticket SET ");
        let mut set = qb.separated(", ");
        if let Some(title) = req.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(department) = req.department {
            set.push("department = ").push_bind_unseparated(department);
        }
        if let Some(description) = req.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(priority) = req.priority {
            set.push("priority = ").push_bind_unseparated(priority.as_str());
        }
        if let Some(status) = req.status {
            set.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(end_at) = req.end_at {
            set.push("end_at = ").push_bind_unseparated(end_at);
        }
        if let Some(github_url) = req.github_url {
            set.push("github_url = ").push_bind_unseparated(github_url);
        }
        if let Some(new_attachment) = &attachment {
            set.push("attachment = ")
                .push_bind_unseparated(new_attachment.clone());
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TICKET_COLUMNS);

        let row = qb.build().fetch_one(&mut *tx).await?;
        let updated = ticket_from_row(&row)?;
        tx.commit().await?;

        info!(
            subsystem = "db",
            component = "pg_tickets",
            op = "update",
            ticket_id = id,
            replaced_attachment = attachment.is_some(),
            "Ticket updated"
        );

        if attachment.is_some() {
            if let Some(previous) = current.attachment {
                if updated.attachment.as_deref() != Some(previous.as_str()) {
                    self.attachments.remove(&previous).await;
                }
            }
        }

        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let attachment: Option<String> =
            sqlx::query_scalar("DELETE FROM ticket WHERE id = $1 RETURNING attachment")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(Error::TicketNotFound(id))?;

        info!(
            subsystem = "db",
            component = "pg_tickets",
            op = "delete",
            ticket_id = id,
            "Ticket deleted"
        );

        if let Some(name) = attachment {
            self.attachments.remove(&name).await;
        }
        Ok(())
    }
}

/// Convert a database row to a Ticket.
fn ticket_from_row(row: &PgRow) -> Result<Ticket> {
    Ok(Ticket {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        department: row.try_get("department")?,
        description: row.try_get("description")?,
        priority: parse_column("priority", &row.try_get::<String, _>("priority")?)?,
        status: parse_column("status", &row.try_get::<String, _>("status")?)?,
        created_at: row.try_get("created_at")?,
        end_at: row.try_get("end_at")?,
        github_url: row.try_get("github_url")?,
        attachment: row.try_get("attachment")?,
    })
}

/// Parse an enum column; a value outside the enum is corrupt data.
fn parse_column<T>(column: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
{
    raw.parse()
        .map_err(|_| Error::Internal(format!("unexpected {} value in ticket row: {:?}", column, raw)))
}
