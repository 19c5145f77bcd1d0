//! Handler modules for helpdesk-api.
//!
//! Each action the dispatcher routes to lives here; the dispatcher owns
//! method checks and body extraction.

pub mod attachments;
pub mod export;
pub mod form;
pub mod tickets;

pub use form::{TicketForm, Upload};
