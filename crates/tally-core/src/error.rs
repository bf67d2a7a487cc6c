//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Link validity, rejected input                  │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  tally-server errors (in app)                                          │
//! │  └── ApiError         - What HTTP clients see                          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                          DbError ───┴──► ApiError → JSON response      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. "Not found", "expired" and "storage unavailable" stay distinct kinds
//! 3. Errors are enum variants, never String
//! 4. Link errors carry no invoice identifiers (the public path is unauthenticated)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The share token is malformed or matches no invoice.
    ///
    /// ## When This Occurs
    /// - Token is not exactly 64 hex characters
    /// - Token was never issued
    #[error("Invoice link is invalid")]
    InvalidToken,

    /// The share token exists but its validity window has passed.
    ///
    /// ## User Workflow
    /// ```text
    /// GET /public/invoices/<token>
    ///      │
    ///      ▼
    /// now > share_token_expires_at ?
    ///      │ yes
    ///      ▼
    /// ExpiredLink ──► 410 "This invoice link has expired"
    /// ```
    #[error("Invoice link expired at {expired_at}")]
    ExpiredLink { expired_at: DateTime<Utc> },

    /// A closed-set value (status, discount type) was not recognised.
    /// Nothing is mutated when this is returned.
    #[error("Rejected {field}: '{value}'")]
    RejectedInput { field: String, value: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a RejectedInput error.
    pub fn rejected(field: impl Into<String>, value: impl Into<String>) -> Self {
        CoreError::RejectedInput {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic or storage work runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed email, unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Number is above the accepted maximum.
    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: Decimal },

    /// Collection has too many entries.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Due date precedes invoice date.
    #[error("due_date {due_date} is before invoice_date {invoice_date}")]
    DueBeforeIssue {
        invoice_date: chrono::NaiveDate,
        due_date: chrono::NaiveDate,
    },
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates a TooLarge error for a field.
    pub fn too_large(field: impl Into<String>, max: Decimal) -> Self {
        ValidationError::TooLarge {
            field: field.into(),
            max,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
