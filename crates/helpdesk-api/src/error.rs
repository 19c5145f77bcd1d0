//! HTTP error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

/// Errors returned by handlers, rendered as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    MethodNotAllowed(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<helpdesk_core::Error> for ApiError {
    fn from(err: helpdesk_core::Error) -> Self {
        match err {
            helpdesk_core::Error::Validation(msg) => ApiError::BadRequest(msg),
            helpdesk_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            err @ helpdesk_core::Error::TicketNotFound(_) => ApiError::NotFound(err.to_string()),
            err => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                subsystem = "api",
                status = status.as_u16(),
                error = %self,
                "Request failed"
            );
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
