//! Ticket actions: list, get, create, update, delete.

use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use helpdesk_core::{
    non_blank, CreateTicketRequest, Error, ListTicketsRequest, Ticket, TicketStatus,
    UpdateTicketRequest,
};

use super::form::{TicketForm, Upload};
use crate::error::ApiError;
use crate::query_types::{parse_end_at, parse_id, parse_optional, ActionQuery};
use crate::AppState;

/// A status no ticket can hold is an exact-match filter with no hits.
pub async fn list_tickets(
    state: &AppState,
    query: ActionQuery,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let status = match parse_optional::<TicketStatus>(query.status.as_deref()) {
        Ok(status) => status,
        Err(_) => {
            debug!(
                subsystem = "api",
                component = "tickets",
                op = "list",
                status = query.status.as_deref().unwrap_or(""),
                "Unknown status filter, nothing matches"
            );
            return Ok(Json(Vec::new()));
        }
    };
    let req = ListTicketsRequest {
        status,
        q: query.q,
        department: query.department,
    };
    let tickets = state.tickets.list(req).await?;
    Ok(Json(tickets))
}

/// A missing ticket is `{}` rather than an error.
pub async fn get_ticket(state: &AppState, query: ActionQuery) -> Result<Json<Value>, ApiError> {
    let id = parse_id(query.id.as_deref())?;
    match state.tickets.get(id).await {
        Ok(ticket) => Ok(Json(json!(ticket))),
        Err(e) if e.is_not_found() => Ok(Json(json!({}))),
        Err(e) => Err(e.into()),
    }
}

pub async fn create_ticket(state: &AppState, form: TicketForm) -> Result<Json<Value>, ApiError> {
    let req = create_request(&form)?;
    let attachment = store_upload(state, form.attachment).await?;

    match state.tickets.create(req, attachment.clone()).await {
        Ok(ticket) => {
            info!(
                subsystem = "api",
                component = "tickets",
                op = "create",
                ticket_id = ticket.id,
                "Ticket created"
            );
            Ok(Json(json!({ "ok": true, "id": ticket.id })))
        }
        Err(e) => {
            discard_upload(state, attachment).await;
            Err(e.into())
        }
    }
}

pub async fn update_ticket(
    state: &AppState,
    query: ActionQuery,
    form: TicketForm,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(form.get("id").or(query.id.as_deref()))?;
    let req = update_request(&form)?;
    let attachment = store_upload(state, form.attachment).await?;

    match state.tickets.update(id, req, attachment.clone()).await {
        Ok(_) => Ok(Json(json!({ "ok": true }))),
        Err(e) => {
            discard_upload(state, attachment).await;
            Err(e.into())
        }
    }
}

pub async fn delete_ticket(
    state: &AppState,
    query: ActionQuery,
    form: TicketForm,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(form.get("id").or(query.id.as_deref()))?;
    state.tickets.delete(id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Build a create request. Title and department are checked before any
/// other field.
fn create_request(form: &TicketForm) -> Result<CreateTicketRequest, ApiError> {
    let mut req = CreateTicketRequest::new(
        form.get("title").unwrap_or_default(),
        form.get("department").unwrap_or_default(),
    );
    req.validate()?;

    req.description = non_blank(form.get("description").map(str::to_string));
    req.priority = parse_optional(form.get("priority"))?.unwrap_or_default();
    req.end_at = match form.get("end_at") {
        Some(raw) => parse_end_at(raw)?,
        None => None,
    };
    req.github_url = non_blank(form.get("github_url").map(str::to_string));
    Ok(req)
}

/// Build a partial update from the fields present in the form.
///
/// Blank priority or status leave the value unchanged; blank description,
/// end_at or github_url clear it.
fn update_request(form: &TicketForm) -> Result<UpdateTicketRequest, ApiError> {
    let req = UpdateTicketRequest {
        title: form.get("title").map(str::to_string),
        department: form.get("department").map(str::to_string),
        description: form
            .get("description")
            .map(|v| non_blank(Some(v.to_string()))),
        priority: parse_optional(form.get("priority"))?,
        status: parse_optional(form.get("status"))?,
        end_at: form.get("end_at").map(parse_end_at).transpose()?,
        github_url: form
            .get("github_url")
            .map(|v| non_blank(Some(v.to_string()))),
    };
    req.validate()?;
    Ok(req)
}

/// Persist an upload through the attachment store.
async fn store_upload(state: &AppState, upload: Option<Upload>) -> Result<Option<String>, ApiError> {
    let Some(upload) = upload else {
        return Ok(None);
    };

    match state
        .attachments
        .store(&upload.data, &upload.file_name, upload.size)
        .await
    {
        Ok(name) => Ok(Some(name)),
        Err(Error::Io(e)) => {
            error!(
                subsystem = "api",
                component = "tickets",
                op = "store_upload",
                error = %e,
                "Attachment write failed"
            );
            Err(ApiError::Internal("Failed to move uploaded file".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a file stored for a request whose row change failed.
async fn discard_upload(state: &AppState, stored_name: Option<String>) {
    if let Some(name) = stored_name {
        state.attachments.remove(&name).await;
    }
}
