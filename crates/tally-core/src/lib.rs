//! # tally-core: Pure Business Logic for Tally Invoicing
//!
//! This crate holds every invoicing rule as a pure function with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Tally Invoicing Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 tally-server (HTTP, axum)                       │   │
//! │  │   create_invoice, update_status, share_invoice, public view    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────────┐         │   │
//! │  │   │  totals  │ │  share   │ │reconcile │ │   draft   │         │   │
//! │  │   │ subtotal │ │  tokens  │ │ balance  │ │ validated │         │   │
//! │  │   │ discount │ │  expiry  │ │  status  │ │  invoice  │         │   │
//! │  │   │   tax    │ │  views   │ │ payments │ │   input   │         │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └───────────┘         │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Invoice, InvoiceItem, Payment, Client)
//! - [`money`] - Decimal-backed Money and TaxRate
//! - [`totals`] - Invoice total calculator
//! - [`share`] - Share-token lifecycle rules
//! - [`reconcile`] - Paid amount, balance due, status transitions
//! - [`draft`] - Invoice creation input
//! - [`validation`] - Field validators and form parsing
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, no hidden state
//! 2. **No I/O**: the only side effect is drawing share-token bytes from the OS RNG
//! 3. **Exact Decimals**: full precision internally, rounding only for display
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::money::TaxRate;
//! use tally_core::totals::{DiscountPolicy, InvoiceTotals, LineAmount};
//!
//! let items = [
//!     LineAmount::new(Decimal::from(2), Decimal::new(2500, 2)),
//!     LineAmount::new(Decimal::from(1), Decimal::new(1000, 2)),
//! ];
//! let discount = DiscountPolicy::Percentage(Decimal::from(10));
//! let tax = TaxRate::from_percentage(Decimal::from(15));
//! let totals = InvoiceTotals::calculate(&items, &discount, tax);
//!
//! assert_eq!(totals.rounded().total.amount(), Decimal::new(6210, 2));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod money;
pub mod reconcile;
pub mod share;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use totals::{DiscountPolicy, InvoiceTotals, LineAmount};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tax rate applied when the form leaves the rate blank or non-positive (percent).
pub const DEFAULT_TAX_RATE_PERCENT: i64 = 15;

/// Maximum line items accepted on a single invoice.
pub const MAX_INVOICE_ITEMS: usize = 100;
