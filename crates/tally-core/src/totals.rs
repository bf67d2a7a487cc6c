//! # Invoice Total Calculator
//!
//! Turns line items, a discount policy and a tax rate into the four derived
//! invoice amounts.
//!
//! ## Calculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  items ──► keep quantity > 0 AND unit_price > 0                        │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  subtotal = Σ quantity × unit_price                                     │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  discount = none       → 0                                              │
//! │             percentage → subtotal × value / 100   (not clamped)         │
//! │             fixed      → min(value, subtotal)                           │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │  taxable = subtotal - discount                                          │
//! │  tax     = taxable × tax_rate                                           │
//! │  total   = taxable + tax                                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items that fail the quantity/price predicate are dropped, not reported.
//! Nothing here rounds: call [`InvoiceTotals::rounded`] when presenting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, TaxRate};
use crate::types::{DiscountType, InvoiceItem};

// =============================================================================
// Line Amount
// =============================================================================

/// The two numbers of a line item that affect totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl LineAmount {
    pub const fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        LineAmount {
            quantity,
            unit_price,
        }
    }

    /// Whether this line contributes to the subtotal.
    #[inline]
    pub fn is_billable(&self) -> bool {
        self.quantity > Decimal::ZERO && self.unit_price > Decimal::ZERO
    }

    /// `quantity × unit_price`, regardless of billability.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::new(self.unit_price).times(self.quantity)
    }

    /// `line_total`, or `None` when the product is out of decimal range.
    #[inline]
    pub fn checked_line_total(&self) -> Option<Money> {
        Money::new(self.unit_price).checked_times(self.quantity)
    }
}

impl From<&InvoiceItem> for LineAmount {
    fn from(item: &InvoiceItem) -> Self {
        LineAmount::new(item.quantity, item.unit_price.amount())
    }
}

// =============================================================================
// Discount Policy
// =============================================================================

/// Discount applied to the subtotal before tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscountPolicy {
    #[default]
    None,
    /// Percentage of the subtotal (10 = 10%).
    Percentage(Decimal),
    /// Currency amount, capped at the subtotal.
    Fixed(Decimal),
}

impl DiscountPolicy {
    /// Rebuilds a policy from its stored columns.
    pub fn from_parts(kind: DiscountType, value: Decimal) -> Self {
        match kind {
            DiscountType::None => DiscountPolicy::None,
            DiscountType::Percentage => DiscountPolicy::Percentage(value),
            DiscountType::Fixed => DiscountPolicy::Fixed(value),
        }
    }

    /// Splits into the stored `(discount_type, discount_value)` columns.
    pub fn parts(&self) -> (DiscountType, Decimal) {
        match *self {
            DiscountPolicy::None => (DiscountType::None, Decimal::ZERO),
            DiscountPolicy::Percentage(value) => (DiscountType::Percentage, value),
            DiscountPolicy::Fixed(value) => (DiscountType::Fixed, value),
        }
    }

    /// Discount for the given subtotal.
    ///
    /// A non-positive value means no discount. Fixed discounts never exceed
    /// the subtotal; percentage discounts above 100 are applied as given.
    pub fn amount_for(&self, subtotal: Money) -> Money {
        match *self {
            DiscountPolicy::None => Money::ZERO,
            DiscountPolicy::Percentage(value) if value > Decimal::ZERO => subtotal.percent(value),
            DiscountPolicy::Fixed(value) if value > Decimal::ZERO => {
                Money::new(value).min(subtotal)
            }
            _ => Money::ZERO,
        }
    }

    /// `amount_for`, or `None` when a percentage discount overflows.
    pub fn checked_amount_for(&self, subtotal: Money) -> Option<Money> {
        match *self {
            DiscountPolicy::Percentage(value) if value > Decimal::ZERO => {
                subtotal.checked_percent(value)
            }
            _ => Some(self.amount_for(subtotal)),
        }
    }
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Derived invoice amounts.
///
/// ## Invariant
/// `total == (subtotal - discount_amount) × (1 + tax_rate)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub taxable_amount: Money,
    pub tax_amount: Money,
    pub total: Money,
}

impl InvoiceTotals {
    /// Computes totals for a set of line amounts.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::TaxRate;
    /// use tally_core::totals::{DiscountPolicy, InvoiceTotals, LineAmount};
    ///
    /// let totals = InvoiceTotals::calculate(&[], &DiscountPolicy::None, TaxRate::zero());
    /// assert!(totals.total.is_zero());
    /// ```
    pub fn calculate(items: &[LineAmount], discount: &DiscountPolicy, tax_rate: TaxRate) -> Self {
        let subtotal: Money = items
            .iter()
            .filter(|item| item.is_billable())
            .map(LineAmount::line_total)
            .sum();

        let discount_amount = discount.amount_for(subtotal);
        let taxable_amount = subtotal - discount_amount;
        let tax_amount = taxable_amount.calculate_tax(tax_rate);

        InvoiceTotals {
            subtotal,
            discount_amount,
            taxable_amount,
            tax_amount,
            total: taxable_amount + tax_amount,
        }
    }

    /// [`calculate`](InvoiceTotals::calculate) for untrusted input.
    ///
    /// Returns `None` if any intermediate amount falls outside the decimal
    /// range, where `calculate` would panic.
    pub fn try_calculate(
        items: &[LineAmount],
        discount: &DiscountPolicy,
        tax_rate: TaxRate,
    ) -> Option<Self> {
        let mut subtotal = Money::ZERO;
        for item in items.iter().filter(|item| item.is_billable()) {
            subtotal = subtotal.checked_add(item.checked_line_total()?)?;
        }

        let discount_amount = discount.checked_amount_for(subtotal)?;
        let taxable_amount = subtotal.checked_sub(discount_amount)?;
        let tax_amount = taxable_amount.checked_tax(tax_rate)?;

        Some(InvoiceTotals {
            subtotal,
            discount_amount,
            taxable_amount,
            tax_amount,
            total: taxable_amount.checked_add(tax_amount)?,
        })
    }

    /// Totals for persisted items (used when recomputing a saved invoice).
    pub fn for_items(items: &[InvoiceItem], discount: &DiscountPolicy, tax_rate: TaxRate) -> Self {
        let amounts: Vec<LineAmount> = items.iter().map(LineAmount::from).collect();
        InvoiceTotals::calculate(&amounts, discount, tax_rate)
    }

    /// Every amount rounded to two places for display.
    pub fn rounded(&self) -> Self {
        InvoiceTotals {
            subtotal: self.subtotal.rounded(),
            discount_amount: self.discount_amount.rounded(),
            taxable_amount: self.taxable_amount.rounded(),
            tax_amount: self.tax_amount.rounded(),
            total: self.total.rounded(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
