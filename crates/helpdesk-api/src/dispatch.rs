//! Single-endpoint action dispatcher.
//!
//! Every request to `/api` names its operation in the `action` query
//! parameter (default `list`). Read actions answer GET and HEAD; write
//! actions require POST and take a form or multipart body.

use axum::{
    extract::{Query, Request, State},
    http::Method,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::ApiError;
use crate::handlers::{attachments, export, tickets, TicketForm};
use crate::query_types::ActionQuery;
use crate::AppState;

/// Operation selected by the `action` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Create,
    Get,
    Update,
    Delete,
    Download,
    ExportCsv,
}

impl Action {
    /// Parse the `action` parameter; absent means `list`.
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        match raw {
            None | Some("list") => Ok(Self::List),
            Some("create") => Ok(Self::Create),
            Some("get") => Ok(Self::Get),
            Some("update") => Ok(Self::Update),
            Some("delete") => Ok(Self::Delete),
            Some("download") => Ok(Self::Download),
            Some("export_csv") => Ok(Self::ExportCsv),
            Some(_) => Err(ApiError::BadRequest("unknown action".to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Download => "download",
            Self::ExportCsv => "export_csv",
        }
    }

    /// Whether the action mutates state.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }

    fn allows(&self, method: &Method) -> bool {
        if self.is_write() {
            method == Method::POST
        } else {
            method == Method::GET || method == Method::HEAD
        }
    }
}

pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<ActionQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    let action = Action::parse(query.action.as_deref())?;
    if !action.allows(&method) {
        return Err(ApiError::MethodNotAllowed(format!(
            "{} requires {}",
            action.as_str(),
            if action.is_write() { "POST" } else { "GET" }
        )));
    }

    debug!(
        subsystem = "api",
        component = "dispatch",
        op = action.as_str(),
        method = %method,
        "Dispatching action"
    );

    let upload_limit = state.attachments.config().max_size_bytes;
    let response = match action {
        Action::List => tickets::list_tickets(&state, query).await?.into_response(),
        Action::Get => tickets::get_ticket(&state, query).await?.into_response(),
        Action::Download => attachments::download(&state, query).await?,
        Action::ExportCsv => export::export_csv(&state).await?,
        Action::Create => {
            let form = TicketForm::read(request, upload_limit).await?;
            tickets::create_ticket(&state, form).await?.into_response()
        }
        Action::Update => {
            let form = TicketForm::read(request, upload_limit).await?;
            tickets::update_ticket(&state, query, form).await?.into_response()
        }
        Action::Delete => {
            let form = TicketForm::read(request, upload_limit).await?;
            tickets::delete_ticket(&state, query, form).await?.into_response()
        }
    };
    Ok(response)
}
