//! Ticket form bodies: `multipart/form-data` or
//! `application/x-www-form-urlencoded`.

use std::collections::HashMap;

use axum::{
    extract::{multipart::Field, FromRequest, Multipart, Request},
    http::header,
    Form,
};
use tracing::debug;

use crate::error::ApiError;

/// Name of the file part carrying the attachment.
pub const ATTACHMENT_FIELD: &str = "attachment";

/// An uploaded file as received.
///
/// `data` holds at most `limit` bytes; `size` is the full length sent by
/// the client, so an oversized file is still reported as such.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub data: Vec<u8>,
    pub size: u64,
}

/// Text fields plus the optional attachment of a write request.
#[derive(Debug, Default)]
pub struct TicketForm {
    fields: HashMap<String, String>,
    pub attachment: Option<Upload>,
}

impl TicketForm {
    /// Read the body of `req`, keeping at most `upload_limit + 1` bytes of
    /// the attachment in memory.
    ///
    /// A request without a content type reads as an empty form.
    pub async fn read(req: Request, upload_limit: u64) -> Result<Self, ApiError> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, &())
                .await
                .map_err(|e| ApiError::BadRequest(format!("Upload error: {}", e.body_text())))?;
            Self::from_multipart(multipart, upload_limit).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, &())
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(Self {
                fields,
                attachment: None,
            })
        } else if content_type.is_empty() {
            Ok(Self::default())
        } else {
            Err(ApiError::BadRequest(format!(
                "Unsupported content type: {}",
                content_type
            )))
        }
    }

    async fn from_multipart(mut multipart: Multipart, upload_limit: u64) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == ATTACHMENT_FIELD {
                form.attachment = read_upload(field, upload_limit).await?;
            } else {
                let value = field.text().await.map_err(upload_error)?;
                form.fields.insert(name, value);
            }
        }

        debug!(
            subsystem = "api",
            component = "form",
            field_count = form.fields.len(),
            has_attachment = form.attachment.is_some(),
            "Multipart form read"
        );
        Ok(form)
    }

    /// Raw value of a text field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            attachment: None,
        }
    }
}

/// Drain a file part. An empty part with no file name (the browser's
/// untouched file input) means no upload.
async fn read_upload(mut field: Field<'_>, limit: u64) -> Result<Option<Upload>, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let mut data = Vec::new();
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(upload_error)? {
        size += chunk.len() as u64;
        if size <= limit.saturating_add(1) {
            data.extend_from_slice(&chunk);
        }
    }

    if file_name.is_empty() && size == 0 {
        return Ok(None);
    }
    Ok(Some(Upload {
        file_name,
        data,
        size,
    }))
}

fn upload_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Upload error: {}", err.body_text()))
}
