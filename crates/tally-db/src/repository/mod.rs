//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler / service                                                │
//! │       │                                                                 │
//! │       │  db.invoices().load_invoice_with_items(id)                     │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── create(&self, prepared)      ← one transaction + numbering        │
//! │  ├── load_invoice_with_items(id)                                       │
//! │  ├── save_invoice_totals(id, totals)                                   │
//! │  └── update_status(id, change)    ← status + payment, one transaction  │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, bound parameters)                       │
//! │       ▼                                                                 │
//! │  *Row struct (TEXT decimals) ──TryFrom──► tally-core domain type       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ClientRepository`](client::ClientRepository) - Client CRUD
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices, items, totals, status
//! - [`PaymentRepository`](payment::PaymentRepository) - Append-only payment history
//! - [`ShareRepository`](share::ShareRepository) - Share tokens and view tracking
//! - [`ReportRepository`](report::ReportRepository) - Date-range aggregates
//! - [`ServiceRepository`](service::ServiceRepository) - Service catalog

pub mod client;
pub mod invoice;
pub mod payment;
pub mod report;
pub mod service;
pub mod share;

use rust_decimal::Decimal;
use std::str::FromStr;
use tally_core::{Money, TaxRate};

use crate::error::{DbError, DbResult};

/// Parses a TEXT decimal column.
pub(crate) fn decimal_column(column: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|_| DbError::corrupt(column, raw))
}

pub(crate) fn money_column(column: &str, raw: &str) -> DbResult<Money> {
    decimal_column(column, raw).map(Money::new)
}

pub(crate) fn tax_rate_column(column: &str, raw: &str) -> DbResult<TaxRate> {
    decimal_column(column, raw).map(TaxRate::from_fraction)
}

/// TEXT form of a decimal for binding.
pub(crate) fn decimal_text(value: Decimal) -> String {
    value.normalize().to_string()
}
