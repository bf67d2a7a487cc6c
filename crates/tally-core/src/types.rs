//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Client      │   │     Invoice     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  client_id      │◄──│  invoice_id     │       │
//! │  │  email (unique) │   │  invoice_number │   │  amount         │       │
//! │  │  name           │   │  totals, status │   │  method, date   │       │
//! │  └─────────────────┘   │  share token    │   └─────────────────┘       │
//! │                        │  view tracking  │                              │
//! │                        └────────▲────────┘                              │
//! │                                 │                                       │
//! │                        ┌────────┴────────┐   ┌─────────────────┐       │
//! │                        │  InvoiceItem    │   │ InvoiceStatus   │       │
//! │                        │  ─────────────  │   │  ─────────────  │       │
//! │                        │  quantity       │   │  Unpaid, Paid   │       │
//! │                        │  unit_price     │   │  Overdue        │       │
//! │                        │  line_total     │   │  PartiallyPaid  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: `invoice_number`, client `email`

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::{Money, TaxRate};
use crate::share::{ShareLink, ShareState, ShareToken, ViewStats};
use crate::totals::{DiscountPolicy, InvoiceTotals};
use crate::validation::{
    normalize_optional, validate_client_name, validate_description, validate_email,
    validate_service_name, validate_unit_price,
};

// =============================================================================
// Invoice Status
// =============================================================================

/// The payment status stored on an invoice.
///
/// Set directly by the status-update operation; no transition graph is
/// enforced between the four values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Issued, nothing recorded yet.
    Unpaid,
    /// Settled.
    Paid,
    /// Marked overdue by the business.
    Overdue,
    /// Some money received.
    PartiallyPaid,
}

impl InvoiceStatus {
    /// All statuses, in the order the admin UI lists them.
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Unpaid,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::PartiallyPaid,
    ];

    /// Stored/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::PartiallyPaid => "partially_paid",
        }
    }

    /// Whether moving to this status books a payment record.
    pub fn books_payment(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::PartiallyPaid)
    }

    /// Whether the invoice still counts towards outstanding balances.
    pub fn is_open(&self) -> bool {
        !matches!(self, InvoiceStatus::Paid)
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the closed set `unpaid | paid | overdue | partially_paid`.
///
/// Anything else is `CoreError::RejectedInput`.
impl FromStr for InvoiceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| CoreError::rejected("status", s))
    }
}

// =============================================================================
// Discount Type
// =============================================================================

/// How the discount value on an invoice is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// No discount.
    None,
    /// Value is a percentage of the subtotal.
    Percentage,
    /// Value is a currency amount, capped at the subtotal.
    Fixed,
}

impl DiscountType {
    /// Stored/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::None => "none",
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl Default for DiscountType {
    fn default() -> Self {
        DiscountType::None
    }
}

impl FromStr for DiscountType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(DiscountType::None),
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(CoreError::rejected("discount_type", other)),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// A customer invoices are addressed to.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Client {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Contact name.
    pub name: String,
    pub company: Option<String>,
    pub address: Option<String>,
    /// Unique per client.
    pub email: String,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewClient {
    /// Checks the name and email shape.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_client_name(&self.name)?;
        validate_email(&self.email)
    }

    /// Trimmed copy with a lowercase email and blank optionals dropped.
    pub fn normalized(&self) -> NewClient {
        NewClient {
            name: self.name.trim().to_string(),
            company: normalize_optional(self.company.as_deref()),
            address: normalize_optional(self.address.as_deref()),
            email: self.email.trim().to_lowercase(),
            phone: normalize_optional(self.phone.as_deref()),
        }
    }
}

// =============================================================================
// Service Catalog
// =============================================================================

/// A billable service offered to clients, used to prefill invoice lines.
///
/// Invoice items copy the description and price at creation time; editing or
/// deleting a service never touches existing invoices.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Money,
    /// Free-text grouping ("Waste removal", "Consulting").
    pub category: Option<String>,
    /// Inactive services stay on file but are hidden from invoice entry.
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a service.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewService {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_price: Money,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl NewService {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_service_name(&self.name)?;
        validate_description(self.description.as_deref().unwrap_or_default())?;
        validate_unit_price(self.unit_price.amount())
    }

    pub fn normalized(&self) -> NewService {
        NewService {
            name: self.name.trim().to_string(),
            description: normalize_optional(self.description.as_deref()),
            unit_price: self.unit_price,
            category: normalize_optional(self.category.as_deref()),
            is_active: self.is_active,
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// An invoice header with persisted totals, share link and view tracking.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub client_id: String,
    /// Human-facing number, e.g. `INV-2026-000042`.
    pub invoice_number: String,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub tax_rate: TaxRate,
    pub discount_type: DiscountType,
    #[ts(as = "String")]
    pub discount_value: Decimal,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total: Money,
    pub status: InvoiceStatus,
    /// 64 hex characters once shared.
    pub share_token: Option<String>,
    #[ts(as = "Option<String>")]
    pub share_token_created_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub share_token_expires_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    /// First public view.
    #[ts(as = "Option<String>")]
    pub viewed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub last_viewed_ip: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// The discount policy recorded on this invoice.
    pub fn discount(&self) -> DiscountPolicy {
        DiscountPolicy::from_parts(self.discount_type, self.discount_value)
    }

    /// The persisted totals as one value.
    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals {
            subtotal: self.subtotal,
            discount_amount: self.discount_amount,
            taxable_amount: self.subtotal - self.discount_amount,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }

    /// The share link, if one has been issued.
    pub fn share_link(&self) -> Option<ShareLink> {
        let token = self.share_token.as_deref()?;
        Some(ShareLink {
            token: ShareToken::parse(token).ok()?,
            created_at: self.share_token_created_at?,
            expires_at: self.share_token_expires_at?,
        })
    }

    /// Computed link state; never stored.
    pub fn share_state(&self, now: DateTime<Utc>) -> ShareState {
        ShareState::of(self.share_link().as_ref(), now)
    }

    /// Public view counters.
    pub fn view_stats(&self) -> ViewStats {
        ViewStats {
            view_count: self.view_count,
            first_viewed_at: self.viewed_at,
            last_viewed_at: self.last_viewed_at,
            last_viewed_ip: self.last_viewed_ip.clone(),
        }
    }
}

// =============================================================================
// Invoice Item
// =============================================================================

/// A billable line on an invoice. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    /// Zero-based order on the invoice.
    pub position: i64,
    pub description: String,
    #[ts(as = "String")]
    pub quantity: Decimal,
    pub unit_price: Money,
    /// `quantity × unit_price`.
    pub line_total: Money,
    /// Free-text repair/work detail.
    pub work_details: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment recorded against an invoice. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub amount: Money,
    /// Free text: "Bank Transfer", "Cash", ...
    pub method: String,
    #[ts(as = "String")]
    pub payment_date: NaiveDate,
    /// External reference (bank transaction id, etc.).
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
