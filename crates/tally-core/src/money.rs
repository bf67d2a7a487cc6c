//! # Money Module
//!
//! Provides the `Money` and `TaxRate` types for invoice arithmetic.
//!
//! ## Why Decimals, Not Cents?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE ROUNDING DRIFT PROBLEM                                             │
//! │                                                                         │
//! │  Invoice lines carry fractional quantities (1.5 hours × $85.00)        │
//! │  and tax rates like 15%. Rounding every step to cents and then         │
//! │  recomputing a saved invoice drifts by a cent here and there.          │
//! │                                                                         │
//! │  OUR SOLUTION: exact 96-bit decimals                                    │
//! │    • every intermediate keeps full precision                           │
//! │    • rounding to 2 places happens once, at presentation                │
//! │    • 0.1 + 0.2 == 0.3, always                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::money::Money;
//!
//! let rate = Money::new(Decimal::new(8500, 2)); // 85.00
//! let line = rate.times(Decimal::new(15, 1));   // × 1.5
//! assert_eq!(line.amount(), Decimal::new(12750, 2));
//! assert_eq!(line.to_string(), "127.50");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

/// Fractional digits shown on invoices, statements and public links.
pub const DISPLAY_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the invoice currency.
///
/// ## Design Decisions
/// - **Decimal (signed)**: balances can go negative when a client overpays
/// - **Single field tuple struct**: zero-cost wrapper, serializes as a string
/// - **No currency symbol**: the symbol is configuration, injected at the edge
///
/// ## Where Money Flows
/// ```text
/// LineItem.unit_price × quantity ──► line_total ──► subtotal
///                                                     │
///                     discount ◄──────────────────────┤
///                                                     ▼
///                               taxable ──► tax ──► total ──► balance_due
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(#[ts(as = "String")] Decimal);

impl Money {
    /// Zero in the invoice currency.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps an exact decimal amount.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Returns the exact (unrounded) amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a (possibly fractional) quantity.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// let unit = Money::new(Decimal::new(2500, 2));
    /// assert_eq!(unit.times(Decimal::from(2)).amount(), Decimal::from(50));
    /// ```
    #[inline]
    pub fn times(&self, quantity: Decimal) -> Money {
        Money(self.0 * quantity)
    }

    /// Returns `percent`% of this amount, unrounded.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// let subtotal = Money::new(Decimal::from(60));
    /// assert_eq!(subtotal.percent(Decimal::from(10)).amount(), Decimal::from(6));
    /// ```
    #[inline]
    pub fn percent(&self, percent: Decimal) -> Money {
        Money(self.0 * percent / Decimal::ONE_HUNDRED)
    }

    /// Calculates tax at the given rate, unrounded.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::{Money, TaxRate};
    ///
    /// let taxable = Money::new(Decimal::from(54));
    /// let tax = taxable.calculate_tax(TaxRate::from_fraction(Decimal::new(15, 2)));
    /// assert_eq!(tax.amount(), Decimal::new(810, 2));
    /// ```
    #[inline]
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money(self.0 * rate.fraction())
    }

    /// [`times`](Money::times) that returns `None` instead of overflowing.
    #[inline]
    pub fn checked_times(&self, quantity: Decimal) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    /// [`percent`](Money::percent) that returns `None` instead of overflowing.
    #[inline]
    pub fn checked_percent(&self, percent: Decimal) -> Option<Money> {
        self.0
            .checked_mul(percent)?
            .checked_div(Decimal::ONE_HUNDRED)
            .map(Money)
    }

    /// [`calculate_tax`](Money::calculate_tax) that returns `None` instead of
    /// overflowing.
    #[inline]
    pub fn checked_tax(&self, rate: TaxRate) -> Option<Money> {
        self.0.checked_mul(rate.fraction()).map(Money)
    }

    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    #[inline]
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Rounds to two fractional digits, half away from zero.
    ///
    /// Presentation only: never feed a rounded value back into a calculation.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::new(Decimal::new(1005, 3)).rounded().amount(), Decimal::new(101, 2));
    /// ```
    pub fn rounded(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// The smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if other < self {
            other
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the amount rounded to two places, without a currency symbol.
///
/// The symbol is supplied by configuration wherever amounts are rendered.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut shown = self.rounded().0;
        shown.rescale(DISPLAY_SCALE);
        write!(f, "{}", shown)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate as a fraction of 1 (0.15 = 15%).
///
/// ## Why a Fraction?
/// The invoice row stores exactly what the calculator multiplies by, so a
/// saved invoice recomputes to the same totals it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(#[ts(as = "String")] Decimal);

impl TaxRate {
    /// Creates a rate from a fraction (0.15 = 15%).
    #[inline]
    pub const fn from_fraction(fraction: Decimal) -> Self {
        TaxRate(fraction)
    }

    /// Creates a rate from a percentage (15 = 15%).
    #[inline]
    pub fn from_percentage(percent: Decimal) -> Self {
        TaxRate(percent / Decimal::ONE_HUNDRED)
    }

    /// The rate as a fraction of 1.
    #[inline]
    pub const fn fraction(&self) -> Decimal {
        self.0
    }

    /// The rate as a percentage (for display).
    #[inline]
    pub fn percentage(&self) -> Decimal {
        (self.0 * Decimal::ONE_HUNDRED).normalize()
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
