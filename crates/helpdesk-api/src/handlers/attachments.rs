//! Attachment download.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::query_types::ActionQuery;
use crate::AppState;

/// Serve a stored file as an `application/octet-stream` download.
///
/// Anything that does not resolve to a file inside the storage root,
/// including traversal attempts, is a 404.
pub async fn download(state: &AppState, query: ActionQuery) -> Result<Response, ApiError> {
    let requested = query.file.unwrap_or_default();
    let (name, data) = state.attachments.read(&requested).await?;

    let content_disposition = format!("attachment; filename=\"{}\"", name);
    let content_disposition = HeaderValue::from_str(&content_disposition)
        .map_err(|_| ApiError::NotFound(format!("Attachment {} not found", requested)))?;

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
        (header::CONTENT_DISPOSITION, content_disposition),
        (header::CONTENT_LENGTH, HeaderValue::from(data.len())),
    ];

    Ok((StatusCode::OK, headers, data).into_response())
}
