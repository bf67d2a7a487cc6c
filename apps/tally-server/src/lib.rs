//! # Tally Server
//!
//! JSON-over-HTTP API for invoicing.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tally Server Services                           │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │ client_service │  │invoice_service │  │  share_service             ││
//! │  │                │  │                │  │                            ││
//! │  │ • create       │  │ • create/list  │  │ • share_invoice            ││
//! │  │ • list / get   │  │ • update_status│  │ • public_invoice           ││
//! │  │                │  │ • payments     │  │   (unauthenticated)        ││
//! │  │                │  │ • statement    │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐             │
//! │  │ report_service │  │catalog_service │  │ health_service │             │
//! │  └────────────────┘  └────────────────┘  └────────────────┘             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  tally-core (rules)              tally-db (SQLite repositories)  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (a `.env` file is honoured):
//! - `TALLY_HTTP_PORT` - listen port (default: 8080)
//! - `TALLY_DATABASE_PATH` - SQLite file (default: ./tally.db)
//! - `TALLY_BASE_URL` - prefix for share links (default: http://localhost:8080)
//! - `TALLY_CURRENCY_SYMBOL` - symbol on statements (default: $)
//! - `TALLY_COMPANY_NAME` - business name on statements
//! - `TALLY_DEFAULT_TAX_RATE` - percent applied when a form has none (default: 15)
//! - `TALLY_SHARE_LINK_DAYS` - share link lifetime (default: 90)
//! - `TALLY_DB_MAX_CONNECTIONS` - pool size (default: 5)
//! - `TALLY_TRUST_PROXY` - record the `X-Forwarded-For` client address
//!   instead of the socket peer (default: false)
//! - `RUST_LOG` - log filter (default: info)

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

// Re-exports
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;
