//! # Payment Reconciliation
//!
//! Paid amount, balance due, displayed payment state, and the rules of a
//! status change.
//!
//! ## Status Update Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /invoices/:id/status  {status, method, payment_date}              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StatusChange::parse ← THIS MODULE                                      │
//! │       │                                                                 │
//! │       ├── unknown status? → RejectedInput (nothing written)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────── one transaction (tally-db) ───────────────┐          │
//! │  │  set_invoice_status(id, status)                            │          │
//! │  │  if status ∈ {paid, partially_paid}:                       │          │
//! │  │      append_payment(booked_payment(total))                 │          │
//! │  └────────────────────────────────────────────────────────────┘          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The booked payment is always the full invoice total, including for
//! `partially_paid`. Reports therefore count a partially paid invoice as
//! fully received.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{InvoiceStatus, Payment};

// =============================================================================
// Balance
// =============================================================================

/// Money received against an invoice and what is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Balance {
    pub total: Money,
    pub paid_amount: Money,
    /// `total - paid_amount`; negative when overpaid.
    pub balance_due: Money,
}

impl Balance {
    /// Sums the recorded payments against `total`.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    /// use tally_core::reconcile::Balance;
    ///
    /// let balance = Balance::from_amounts(
    ///     Money::new(Decimal::from(120)),
    ///     [Money::new(Decimal::from(50)), Money::new(Decimal::from(20))],
    /// );
    /// assert_eq!(balance.balance_due.amount(), Decimal::from(50));
    /// ```
    pub fn from_amounts(total: Money, amounts: impl IntoIterator<Item = Money>) -> Self {
        let paid_amount: Money = amounts.into_iter().sum();
        Balance {
            total,
            paid_amount,
            balance_due: total - paid_amount,
        }
    }

    /// Balance for an invoice total and its payment history.
    pub fn from_payments(total: Money, payments: &[Payment]) -> Self {
        Balance::from_amounts(total, payments.iter().map(|p| p.amount))
    }

    /// Nothing left to pay.
    pub fn is_settled(&self) -> bool {
        !self.balance_due.is_positive()
    }

    /// Presentation copy rounded to two places.
    pub fn rounded(&self) -> Self {
        Balance {
            total: self.total.rounded(),
            paid_amount: self.paid_amount.rounded(),
            balance_due: self.balance_due.rounded(),
        }
    }
}

// =============================================================================
// Derived Payment State
// =============================================================================

/// Payment state shown in listings, derived from stored status, due date
/// and payments rather than read back from the status column alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Paid,
    Overdue,
    PartiallyPaid,
    Unpaid,
}

/// Precedence: a paid status wins, then a past due date, then a partial
/// payment.
pub fn derive_payment_state(
    status: InvoiceStatus,
    due_date: NaiveDate,
    paid: Money,
    total: Money,
    today: NaiveDate,
) -> PaymentState {
    if status == InvoiceStatus::Paid {
        PaymentState::Paid
    } else if due_date < today {
        PaymentState::Overdue
    } else if paid.is_positive() && paid < total {
        PaymentState::PartiallyPaid
    } else {
        PaymentState::Unpaid
    }
}

// =============================================================================
// Status Change
// =============================================================================

/// A payment about to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentDraft {
    pub invoice_id: String,
    pub amount: Money,
    pub method: String,
    #[ts(as = "String")]
    pub payment_date: NaiveDate,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

/// A validated request to set an invoice status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: InvoiceStatus,
    pub method: String,
    pub payment_date: NaiveDate,
}

impl StatusChange {
    /// Parses the target status. Fails with `RejectedInput` before anything
    /// is written.
    pub fn parse(status: &str, method: &str, payment_date: NaiveDate) -> CoreResult<Self> {
        Ok(StatusChange {
            status: status.parse()?,
            method: method.trim().to_string(),
            payment_date,
        })
    }

    /// The payment this change books, if any: the full invoice total for
    /// `paid` and `partially_paid`.
    pub fn booked_payment(&self, invoice_id: &str, total: Money) -> Option<PaymentDraft> {
        self.status.books_payment().then(|| PaymentDraft {
            invoice_id: invoice_id.to_string(),
            amount: total,
            method: self.method.clone(),
            payment_date: self.payment_date,
            transaction_id: None,
            notes: None,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use rust_decimal_macros::dec;

    fn money(value: rust_decimal::Decimal) -> Money {
        Money::new(value)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_balance_after_two_payments() {
        let balance = Balance::from_amounts(money(dec!(120)), [money(dec!(50)), money(dec!(20))]);
        assert_eq!(balance.paid_amount, money(dec!(70)));
        assert_eq!(balance.balance_due, money(dec!(50)));
        assert!(!balance.is_settled());
    }

    #[test]
    fn test_balance_without_payments() {
        let balance = Balance::from_amounts(money(dec!(62.1)), []);
        assert!(balance.paid_amount.is_zero());
        assert_eq!(balance.balance_due, money(dec!(62.1)));
    }

    #[test]
    fn test_overpayment_is_not_clamped() {
        let balance = Balance::from_amounts(money(dec!(100)), [money(dec!(100)), money(dec!(100))]);
        assert_eq!(balance.balance_due, money(dec!(-100)));
        assert!(balance.is_settled());
    }

    #[test]
    fn test_derive_payment_state_precedence() {
        let today = date(2026, 3, 10);
        let total = money(dec!(100));

        // Paid wins even when past due
        assert_eq!(
            derive_payment_state(InvoiceStatus::Paid, date(2026, 1, 1), Money::ZERO, total, today),
            PaymentState::Paid
        );
        let forty = money(dec!(40));
        assert_eq!(
            derive_payment_state(InvoiceStatus::Unpaid, date(2026, 3, 9), forty, total, today),
            PaymentState::Overdue
        );
        assert_eq!(
            derive_payment_state(InvoiceStatus::Unpaid, date(2026, 3, 10), forty, total, today),
            PaymentState::PartiallyPaid
        );
        let flagged = InvoiceStatus::PartiallyPaid;
        assert_eq!(
            derive_payment_state(flagged, date(2026, 4, 1), Money::ZERO, total, today),
            PaymentState::Unpaid
        );
        assert_eq!(
            derive_payment_state(InvoiceStatus::Overdue, date(2026, 4, 1), total, total, today),
            PaymentState::Unpaid
        );
    }

    #[test]
    fn test_status_change_rejects_unknown_status() {
        let err = StatusChange::parse("refunded", "Cash", date(2026, 1, 1)).unwrap_err();
        assert!(matches!(err, CoreError::RejectedInput { .. }));
    }

    #[test]
    fn test_paid_books_full_total() {
        let change = StatusChange::parse("paid", " Bank Transfer ", date(2026, 2, 1)).unwrap();
        let payment = change.booked_payment("inv-1", money(dec!(62.1))).unwrap();

        assert_eq!(payment.amount, money(dec!(62.1)));
        assert_eq!(payment.method, "Bank Transfer");
        assert_eq!(payment.payment_date, date(2026, 2, 1));
    }

    #[test]
    fn test_partially_paid_also_books_full_total() {
        let change = StatusChange::parse("partially_paid", "Cash", date(2026, 2, 1)).unwrap();
        let payment = change.booked_payment("inv-1", money(dec!(80))).unwrap();
        assert_eq!(payment.amount, money(dec!(80)));
    }

    #[test]
    fn test_unpaid_and_overdue_book_nothing() {
        for status in ["unpaid", "overdue"] {
            let change = StatusChange::parse(status, "", date(2026, 2, 1)).unwrap();
            assert!(change.booked_payment("inv-1", money(dec!(80))).is_none());
        }
    }
}
