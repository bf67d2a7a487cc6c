//! # tally-db: Database Layer for Tally
//!
//! Persistence for clients, invoices, line items and payments. SQLite via
//! sqlx, with embedded migrations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  HTTP handler (POST /invoices/:id/share)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ClientRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │    │ InvoiceRepo   │    │ 001_initial_ │  │   │
//! │  │   │ WAL, FKs,     │◄───│ PaymentRepo   │    │   schema.sql │  │   │
//! │  │   │ busy timeout  │    │ ShareRepo     │    │              │  │   │
//! │  │   │               │    │ ReportRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (tally.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//!
//! let loaded = db.invoices().load_invoice_with_items(&invoice_id).await?;
//! let link = db.shares().ensure_share_token(&invoice_id, lifetime, Utc::now()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::invoice::{InvoiceRepository, InvoiceWithItems, StatusUpdate};
pub use repository::payment::PaymentRepository;
pub use repository::report::{
    ClientHistory, MethodTotals, MonthlyTotals, OutstandingInvoice, OutstandingReport,
    PaymentHistoryEntry, ReportRepository, ReportSummary,
};
pub use repository::service::ServiceRepository;
pub use repository::share::ShareRepository;
