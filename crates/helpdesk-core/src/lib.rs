//! # helpdesk-core
//!
//! Core types, traits, and abstractions for the helpdesk ticket tracker.
//!
//! This crate provides the ticket data model, the repository trait that
//! storage backends implement, the shared error type, and the attachment
//! configuration consumed by the file store.

pub mod config;
pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::AttachmentConfig;
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
