//! CSV export of all tickets.

use std::borrow::Cow;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use helpdesk_core::{defaults, ListTicketsRequest, Ticket};

use crate::error::ApiError;
use crate::AppState;

/// Exported columns, in order. Description is not exported.
pub const CSV_COLUMNS: [&str; 9] = [
    "id",
    "title",
    "department",
    "priority",
    "status",
    "created_at",
    "end_at",
    "github_url",
    "attachment",
];

pub async fn export_csv(state: &AppState) -> Result<Response, ApiError> {
    let tickets = state.tickets.list(ListTicketsRequest::default()).await?;
    let body = tickets_to_csv(&tickets);

    info!(
        subsystem = "api",
        component = "export",
        op = "export_csv",
        result_count = tickets.len(),
        "Tickets exported"
    );

    let content_disposition = format!("attachment; filename={}", defaults::CSV_EXPORT_FILENAME);
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/csv; charset=utf-8"),
        ),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&content_disposition)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        ),
    ];
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Render tickets as CSV with a header row, one `\n`-terminated line each.
pub fn tickets_to_csv(tickets: &[Ticket]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_COLUMNS.iter().map(|c| Cow::Borrowed(*c)));
    for ticket in tickets {
        push_row(
            &mut out,
            [
                Cow::Owned(ticket.id.to_string()),
                Cow::Borrowed(ticket.title.as_str()),
                Cow::Borrowed(ticket.department.as_str()),
                Cow::Borrowed(ticket.priority.as_str()),
                Cow::Borrowed(ticket.status.as_str()),
                Cow::Owned(timestamp(&ticket.created_at)),
                Cow::Owned(ticket.end_at.as_ref().map(timestamp).unwrap_or_default()),
                Cow::Borrowed(ticket.github_url.as_deref().unwrap_or("")),
                Cow::Borrowed(ticket.attachment.as_deref().unwrap_or("")),
            ],
        );
    }
    out
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = Cow<'a, str>>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(&field));
    }
    out.push('\n');
}

/// Quote a field if it contains a comma, quote, CR or LF; double quotes.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
