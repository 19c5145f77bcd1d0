//! Centralized default constants for helpdesk.
//!
//! All crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Directory holding attachment files, relative to the working directory.
pub const UPLOAD_DIR: &str = "uploads";

/// Maximum accepted attachment size (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Attachment extensions accepted by default (lowercase, no dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf", "zip", "txt", "log"];

/// Random bytes in a generated stored name (hex encoded to twice as many chars).
pub const STORED_NAME_RANDOM_BYTES: usize = 16;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default request body limit. Larger than [`MAX_UPLOAD_BYTES`] so that an
/// oversized file reaches validation instead of being cut off by the
/// transport layer.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// CORS preflight cache lifetime.
pub const CORS_MAX_AGE_SECS: u64 = 3600;

/// Filename offered for the CSV export download.
pub const CSV_EXPORT_FILENAME: &str = "tickets_export.csv";

// =============================================================================
// DATABASE
// =============================================================================

/// Default database URL when `DATABASE_URL` is unset.
pub const DATABASE_URL: &str = "postgres://localhost/helpdesk";

/// Default maximum pool connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default minimum pool connections.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Default pool acquire timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;
