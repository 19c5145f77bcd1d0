//! # helpdesk-db
//!
//! Storage layer for helpdesk.
//!
//! This crate provides:
//! - Connection pool management
//! - The PostgreSQL ticket repository
//! - An in-memory ticket repository for tests and local runs
//! - The filesystem attachment store
//!
//! ## Example
//!
//! ```rust,ignore
//! use helpdesk_db::{AttachmentConfig, AttachmentStore, CreateTicketRequest, Database, PoolConfig, TicketRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let attachments = AttachmentStore::open(AttachmentConfig::new("uploads")).await?;
//!     let db = Database::connect("postgres://localhost/helpdesk", PoolConfig::default(), attachments).await?;
//!
//!     let ticket = db.tickets.create(CreateTicketRequest::new("Printer broken", "IT"), None).await?;
//!     println!("Created ticket: {}", ticket.id);
//!     Ok(())
//! }
//! ```
pub mod attachments;
pub mod memory;
pub mod pool;
pub mod tickets;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use helpdesk_core::*;

pub use attachments::AttachmentStore;
pub use memory::MemoryTicketRepository;
pub use pool::{create_pool_with_config, PoolConfig};
pub use tickets::PgTicketRepository;

use sqlx::PgPool;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// PostgreSQL-backed storage handles.
pub struct Database {
    pool: PgPool,
    /// Ticket repository.
    pub tickets: PgTicketRepository,
    /// Attachment store shared with the ticket repository.
    pub attachments: AttachmentStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: PgPool, attachments: AttachmentStore) -> Self {
        Self {
            tickets: PgTicketRepository::new(pool.clone(), attachments.clone()),
            attachments,
            pool,
        }
    }

    /// Connect and run pending migrations.
    pub async fn connect(url: &str, config: PoolConfig, attachments: AttachmentStore) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        let db = Self::new(pool, attachments);
        #[cfg(feature = "migrations")]
        db.migrate().await?;
        Ok(db)
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
