//! In-memory ticket repository.
//!
//! Suitable for tests and local runs without PostgreSQL. Tickets live in a
//! `BTreeMap` behind an `Arc<Mutex<>>`; every operation takes the lock.
//! Ids come from a counter and are never reused after deletion.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use helpdesk_core::{
    CreateTicketRequest, Error, ListTicketsRequest, Result, Ticket, TicketRepository,
    TicketStatus, UpdateTicketRequest,
};

use crate::attachments::AttachmentStore;

struct Inner {
    tickets: BTreeMap<i64, Ticket>,
    next_id: i64,
}

/// Ticket repository kept entirely in process memory.
#[derive(Clone)]
pub struct MemoryTicketRepository {
    inner: Arc<Mutex<Inner>>,
    attachments: AttachmentStore,
}

impl MemoryTicketRepository {
    /// Create an empty repository that cleans up files through `attachments`.
    pub fn new(attachments: AttachmentStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                tickets: BTreeMap::new(),
                next_id: 1,
            })),
            attachments,
        }
    }

    /// Number of stored tickets.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.tickets.len()
    }

    /// Whether no tickets are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.tickets.is_empty()
    }
}

#[async_trait]
impl TicketRepository for MemoryTicketRepository {
    async fn list(&self, req: ListTicketsRequest) -> Result<Vec<Ticket>> {
        let inner = self.inner.lock().await;
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|ticket| req.matches(ticket))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        debug!(
            subsystem = "db",
            component = "memory_tickets",
            op = "list",
            result_count = tickets.len(),
            "Listed tickets"
        );
        Ok(tickets)
    }

    async fn get(&self, id: i64) -> Result<Ticket> {
        self.inner
            .lock()
            .await
            .tickets
            .get(&id)
            .cloned()
            .ok_or(Error::TicketNotFound(id))
    }

    async fn create(
        &self,
        req: CreateTicketRequest,
        attachment: Option<String>,
    ) -> Result<Ticket> {
        req.validate()?;

        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let ticket = Ticket {
            id,
            title: req.title,
            department: req.department,
            description: req.description,
            priority: req.priority,
            status: TicketStatus::Open,
            created_at: Utc::now(),
            end_at: req.end_at,
            github_url: req.github_url,
            attachment,
        };
        inner.tickets.insert(id, ticket.clone());

        info!(
            subsystem = "db",
            component = "memory_tickets",
            op = "create",
            ticket_id = id,
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

        let (updated, replaced) = {
            let mut inner = self.inner.lock().await;
            let ticket = inner
                .tickets
                .get_mut(&id)
                .ok_or(Error::TicketNotFound(id))?;
            ticket.apply(req);
            let replaced = match attachment {
                Some(new_attachment) => ticket
                    .attachment
                    .replace(new_attachment)
                    .filter(|old| ticket.attachment.as_deref() != Some(old.as_str())),
                None => None,
            };
            (ticket.clone(), replaced)
        };

        info!(
            subsystem = "db",
            component = "memory_tickets",
            op = "update",
            ticket_id = id,
            "Ticket updated"
        );

        if let Some(old) = replaced {
            self.attachments.remove(&old).await;
        }
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let removed = self
            .inner
            .lock()
            .await
            .tickets
            .remove(&id)
            .ok_or(Error::TicketNotFound(id))?;

        info!(
            subsystem = "db",
            component = "memory_tickets",
            op = "delete",
            ticket_id = id,
            "Ticket deleted"
        );

        if let Some(name) = removed.attachment {
            self.attachments.remove(&name).await;
        }
        Ok(())
    }
}
