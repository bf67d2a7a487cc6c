//! # Validation Module
//!
//! Field validators and lenient form-number parsing for Tally.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (tally-server)                                  │
//! │  └── Type validation (JSON deserialization)                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, lengths, email shape, date order                 │
//! │  └── Lenient numbers: malformed → "not provided", never an error       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Foreign keys, share-token CHECK                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_client_name, validate_email};
//!
//! validate_client_name("Aroha Ngata").unwrap();
//! validate_email("aroha@example.co.nz").unwrap();
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{CoreResult, ValidationError};
use crate::money::TaxRate;
use crate::totals::DiscountPolicy;
use crate::types::DiscountType;
use crate::MAX_INVOICE_ITEMS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted line-item description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Longest accepted invoice note.
pub const MAX_NOTES_LEN: usize = 2000;

/// Largest accepted line-item quantity.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Largest accepted unit price, and the largest discount value.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Largest accepted tax rate, in percent.
pub const MAX_TAX_PERCENT: Decimal = Decimal::ONE_HUNDRED;

const MAX_NAME_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// String Validators
// =============================================================================

/// Checks that an identifier field is present.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Validates a client name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_client_name;
///
/// assert!(validate_client_name("Trash Removal Ltd").is_ok());
/// assert!(validate_client_name("   ").is_err());
/// ```
pub fn validate_client_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    validate_required("name", name)?;

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Only the shape is checked: one `@`, a non-empty local part and a dotted
/// domain. Deliverability is not our concern.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    validate_required("email", email)?;

    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(())
}

/// Validates a catalog service name.
pub fn validate_service_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    validate_required("name", name)?;
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

/// Validates a line-item description length. Emptiness is handled by the
/// billable-item filter, not here.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.trim().chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// Validates optional invoice notes.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(notes) if notes.chars().count() > MAX_NOTES_LEN => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        }),
        _ => Ok(()),
    }
}

/// Trims text and maps blank values to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Date Validators
// =============================================================================

/// The due date may equal the invoice date but not precede it.
pub fn validate_due_date(invoice_date: NaiveDate, due_date: NaiveDate) -> ValidationResult<()> {
    if due_date < invoice_date {
        return Err(ValidationError::DueBeforeIssue {
            invoice_date,
            due_date,
        });
    }
    Ok(())
}

/// Parses an ISO-8601 calendar date (`2026-03-31`).
pub fn parse_date(field: &str, raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "expected YYYY-MM-DD".to_string(),
    })
}

// =============================================================================
// Numeric Parsing
// =============================================================================

/// Parses a form number, keeping it only when it is strictly positive.
///
/// Non-numeric, zero and negative input all mean "not provided".
///
/// ## Example
/// ```rust
/// use tally_core::validation::parse_positive_decimal;
///
/// assert!(parse_positive_decimal("2.5").is_some());
/// assert!(parse_positive_decimal("abc").is_none());
/// assert!(parse_positive_decimal("-3").is_none());
/// assert!(parse_positive_decimal("0").is_none());
/// ```
pub fn parse_positive_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .filter(|value| *value > Decimal::ZERO)
}

/// Rejects a number above `max`.
pub fn validate_at_most(field: &str, value: Decimal, max: Decimal) -> ValidationResult<()> {
    if value > max {
        return Err(ValidationError::too_large(field, max));
    }
    Ok(())
}

/// A catalog price: strictly positive and at most [`MAX_AMOUNT`].
pub fn validate_unit_price(price: Decimal) -> ValidationResult<()> {
    if price <= Decimal::ZERO {
        return Err(ValidationError::InvalidFormat {
            field: "unit_price".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    validate_at_most("unit_price", price, MAX_AMOUNT)
}

/// Bounds a billable line so its product stays well inside decimal range.
pub fn validate_line_amount(quantity: Decimal, unit_price: Decimal) -> ValidationResult<()> {
    validate_at_most("quantity", quantity, MAX_QUANTITY)?;
    validate_at_most("unit_price", unit_price, MAX_AMOUNT)
}

/// Tax rate from a percentage field, falling back to `default` when the
/// field is blank, non-numeric or non-positive. Rates above 100% are
/// rejected.
pub fn parse_tax_percentage(raw: Option<&str>, default: TaxRate) -> ValidationResult<TaxRate> {
    match raw.and_then(parse_positive_decimal) {
        Some(percent) => {
            validate_at_most("tax_rate", percent, MAX_TAX_PERCENT)?;
            Ok(TaxRate::from_percentage(percent))
        }
        None => Ok(default),
    }
}

/// Discount policy from the form's type and value fields.
///
/// An unknown type is rejected; a malformed value means no discount.
pub fn parse_discount(kind: Option<&str>, value: Option<&str>) -> CoreResult<DiscountPolicy> {
    let kind: DiscountType = kind.unwrap_or_default().parse()?;
    let value = value.and_then(parse_positive_decimal).unwrap_or(Decimal::ZERO);
    if kind != DiscountType::None {
        validate_at_most("discount_value", value, MAX_AMOUNT)?;
    }
    Ok(DiscountPolicy::from_parts(kind, value))
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of submitted line items.
pub fn validate_item_count(count: usize) -> ValidationResult<()> {
    if count > MAX_INVOICE_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_INVOICE_ITEMS,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
