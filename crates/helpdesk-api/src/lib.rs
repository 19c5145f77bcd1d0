//! helpdesk-api - HTTP API for the helpdesk ticket tracker.
//!
//! The binary in `main.rs` wires configuration, logging and storage; this
//! library exposes the router so tests can serve it against any
//! [`TicketRepository`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod query_types;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use helpdesk_core::{defaults, TicketRepository};
use helpdesk_db::AttachmentStore;

pub use config::ApiConfig;
pub use error::ApiError;

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub tickets: Arc<dyn TicketRepository>,
    pub attachments: AttachmentStore,
}

impl AppState {
    pub fn new(tickets: Arc<dyn TicketRepository>, attachments: AttachmentStore) -> Self {
        Self {
            tickets,
            attachments,
        }
    }
}

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router with its middleware stack.
///
/// `/api.php` is an alias of `/api` for clients of the original script.
pub fn router(state: AppState, config: &ApiConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api", any(dispatch::dispatch))
        .route("/api.php", any(dispatch::dispatch))
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins(
                    &config.allowed_origins,
                )))
                .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(Duration::from_secs(defaults::CORS_MAX_AGE_SECS)),
        )
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .with_state(state)
}

/// Parse configured CORS origins, dropping invalid entries with a warning.
pub fn parse_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
