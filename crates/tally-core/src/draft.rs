//! # Invoice Drafts
//!
//! Turns submitted invoice input into a validated, fully priced invoice
//! ready for a single insert transaction.
//!
//! ## Creation Flow
//! ```text
//! InvoiceForm (JSON, lenient numbers)
//!      │  into_draft(default_tax, today)
//!      ▼
//! InvoiceDraft ── prepare() ──► PreparedInvoice { items, totals }
//!      │                              │
//!      │  client_id required          │  only billable items survive,
//!      │  due_date ≥ invoice_date     │  numbered by position
//!      │  notes ≤ 2000                │
//!      │  ≥ 1 billable item           ▼
//!      │                        tally-db: insert invoice + items
//! ```
//!
//! Quantities, prices, the discount value and the tax rate are bounded
//! (see `validation`), so pricing a prepared draft cannot overflow.
//!
//! Malformed item numbers never fail the request. They make the item
//! non-billable, and a draft left with no billable item fails with
//! `Required { field: "items" }`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::{Money, TaxRate};
use crate::totals::{DiscountPolicy, InvoiceTotals, LineAmount};
use crate::validation::{
    normalize_optional, parse_date, parse_discount, parse_positive_decimal, parse_tax_percentage,
    validate_description, validate_due_date, validate_item_count, validate_line_amount,
    validate_notes, validate_required,
};

// =============================================================================
// Form Input
// =============================================================================

/// A number as submitted: JSON number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormNumber {
    Number(serde_json::Number),
    Text(String),
}

impl FormNumber {
    /// Strictly positive value, or `None` for anything malformed.
    pub fn positive(&self) -> Option<Decimal> {
        match self {
            FormNumber::Number(n) => parse_positive_decimal(&n.to_string()),
            FormNumber::Text(s) => parse_positive_decimal(s),
        }
    }

    fn as_text(&self) -> String {
        match self {
            FormNumber::Number(n) => n.to_string(),
            FormNumber::Text(s) => s.clone(),
        }
    }
}

/// One submitted line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemForm {
    pub description: String,
    pub quantity: FormNumber,
    pub unit_price: FormNumber,
    #[serde(default)]
    pub work_details: Option<String>,
}

/// Invoice creation request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceForm {
    pub client_id: String,
    /// Defaults to today.
    #[serde(default)]
    pub invoice_date: Option<String>,
    pub due_date: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Percentage, e.g. 15.
    #[serde(default)]
    pub tax_rate: Option<FormNumber>,
    #[serde(default)]
    pub discount_type: Option<String>,
    #[serde(default)]
    pub discount_value: Option<FormNumber>,
    pub items: Vec<LineItemForm>,
}

impl InvoiceForm {
    /// Resolves dates, the tax rate and the discount into a typed draft.
    pub fn into_draft(self, default_tax: TaxRate, today: NaiveDate) -> CoreResult<InvoiceDraft> {
        let invoice_date = match self.invoice_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_date("invoice_date", raw)?,
            _ => today,
        };
        let due_date = parse_date("due_date", &self.due_date)?;

        let tax_text = self.tax_rate.as_ref().map(FormNumber::as_text);
        let tax_rate = parse_tax_percentage(tax_text.as_deref(), default_tax)?;

        let discount_text = self.discount_value.as_ref().map(FormNumber::as_text);
        let discount = parse_discount(self.discount_type.as_deref(), discount_text.as_deref())?;

        let items = self
            .items
            .iter()
            .map(|item| LineItemInput {
                description: item.description.trim().to_string(),
                quantity: item.quantity.positive().unwrap_or(Decimal::ZERO),
                unit_price: item.unit_price.positive().unwrap_or(Decimal::ZERO),
                work_details: normalize_optional(item.work_details.as_deref()),
            })
            .collect();

        Ok(InvoiceDraft {
            client_id: self.client_id.trim().to_string(),
            invoice_date,
            due_date,
            notes: normalize_optional(self.notes.as_deref()),
            tax_rate,
            discount,
            items,
        })
    }
}

// =============================================================================
// Draft
// =============================================================================

/// A line item after number parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub work_details: Option<String>,
}

impl LineItemInput {
    /// Builds an item from raw form text; malformed numbers become zero so
    /// the item is excluded rather than rejected.
    ///
    /// ```rust
    /// use tally_core::draft::LineItemInput;
    ///
    /// assert!(LineItemInput::from_form("Skip bin", "2", "25", None).is_billable());
    /// assert!(!LineItemInput::from_form("Skip bin", "two", "25", None).is_billable());
    /// ```
    pub fn from_form(
        description: &str,
        quantity: &str,
        unit_price: &str,
        work_details: Option<&str>,
    ) -> Self {
        LineItemInput {
            description: description.trim().to_string(),
            quantity: parse_positive_decimal(quantity).unwrap_or(Decimal::ZERO),
            unit_price: parse_positive_decimal(unit_price).unwrap_or(Decimal::ZERO),
            work_details: normalize_optional(work_details),
        }
    }

    pub fn amount(&self) -> LineAmount {
        LineAmount::new(self.quantity, self.unit_price)
    }

    /// Non-empty description, positive quantity and positive price.
    pub fn is_billable(&self) -> bool {
        !self.description.is_empty() && self.amount().is_billable()
    }
}

/// Typed invoice creation input.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub client_id: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub tax_rate: TaxRate,
    pub discount: DiscountPolicy,
    pub items: Vec<LineItemInput>,
}

/// A line item ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedItem {
    pub position: i64,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub line_total: Money,
    pub work_details: Option<String>,
}

/// A validated draft with its totals computed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedInvoice {
    pub client_id: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub tax_rate: TaxRate,
    pub discount: DiscountPolicy,
    pub items: Vec<PreparedItem>,
    pub totals: InvoiceTotals,
}

impl InvoiceDraft {
    /// Validates the draft, drops non-billable items and prices the rest.
    pub fn prepare(self) -> Result<PreparedInvoice, ValidationError> {
        validate_required("client_id", &self.client_id)?;
        validate_due_date(self.invoice_date, self.due_date)?;
        validate_notes(self.notes.as_deref())?;
        validate_item_count(self.items.len())?;
        for item in &self.items {
            validate_description(&item.description)?;
            if item.is_billable() {
                validate_line_amount(item.quantity, item.unit_price)?;
            }
        }

        let items: Vec<PreparedItem> = self
            .items
            .into_iter()
            .filter(LineItemInput::is_billable)
            .enumerate()
            .map(|(position, item)| PreparedItem {
                position: position as i64,
                line_total: item.amount().line_total(),
                unit_price: Money::new(item.unit_price),
                quantity: item.quantity,
                description: item.description,
                work_details: item.work_details,
            })
            .collect();

        if items.is_empty() {
            return Err(ValidationError::required("items"));
        }

        let amounts: Vec<LineAmount> = items
            .iter()
            .map(|item| LineAmount::new(item.quantity, item.unit_price.amount()))
            .collect();
        let totals = InvoiceTotals::try_calculate(&amounts, &self.discount, self.tax_rate)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "items".to_string(),
                reason: "invoice amounts are out of range".to_string(),
            })?;

        Ok(PreparedInvoice {
            client_id: self.client_id,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            notes: self.notes,
            tax_rate: self.tax_rate,
            discount: self.discount,
            items,
            totals,
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

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn draft(items: Vec<LineItemInput>) -> InvoiceDraft {
        InvoiceDraft {
            client_id: "client-1".to_string(),
            invoice_date: today(),
            due_date: today() + chrono::Duration::days(14),
            notes: None,
            tax_rate: TaxRate::from_percentage(dec!(15)),
            discount: DiscountPolicy::Percentage(dec!(10)),
            items,
        }
    }

    fn form_json(body: serde_json::Value) -> InvoiceForm {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_prepare_prices_billable_items() {
        let prepared = draft(vec![
            LineItemInput::from_form("Bin hire", "2", "25.00", None),
            LineItemInput::from_form("Green waste", "1", "10.00", Some("  ")),
        ])
        .prepare()
        .unwrap();

        assert_eq!(prepared.items.len(), 2);
        assert_eq!(prepared.items[0].line_total.amount(), dec!(50));
        assert_eq!(prepared.items[1].position, 1);
        assert_eq!(prepared.items[1].work_details, None);

        let totals = prepared.totals.rounded();
        assert_eq!(totals.subtotal.amount(), dec!(60.00));
        assert_eq!(totals.discount_amount.amount(), dec!(6.00));
        assert_eq!(totals.tax_amount.amount(), dec!(8.10));
        assert_eq!(totals.total.amount(), dec!(62.10));
    }

    #[test]
    fn test_prepare_drops_non_billable_items() {
        let prepared = draft(vec![
            LineItemInput::from_form("", "1", "10", None),
            LineItemInput::from_form("Free pickup", "1", "0", None),
            LineItemInput::from_form("Typo", "x", "10", None),
            LineItemInput::from_form("Bin hire", "1", "40", None),
        ])
        .prepare()
        .unwrap();

        assert_eq!(prepared.items.len(), 1);
        assert_eq!(prepared.items[0].description, "Bin hire");
        assert_eq!(prepared.items[0].position, 0);
        assert_eq!(prepared.totals.subtotal.amount(), dec!(40));
    }

    #[test]
    fn test_prepare_requires_a_billable_item() {
        let err = draft(vec![LineItemInput::from_form("Nothing", "0", "10", None)])
            .prepare()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Required { ref field } if field == "items"));
    }

    #[test]
    fn test_prepare_requires_client() {
        let mut d = draft(vec![LineItemInput::from_form("Bin", "1", "1", None)]);
        d.client_id = " ".to_string();
        assert!(matches!(d.prepare(), Err(ValidationError::Required { .. })));
    }

    #[test]
    fn test_prepare_rejects_due_before_issue() {
        let mut d = draft(vec![LineItemInput::from_form("Bin", "1", "1", None)]);
        d.due_date = today().pred_opt().unwrap();
        assert!(matches!(d.prepare(), Err(ValidationError::DueBeforeIssue { .. })));
    }

    #[test]
    fn test_prepare_rejects_long_description() {
        let long = "d".repeat(501);
        let d = draft(vec![LineItemInput::from_form(&long, "1", "1", None)]);
        assert!(matches!(d.prepare(), Err(ValidationError::TooLong { .. })));
    }

    #[test]
    fn test_form_accepts_numbers_and_text() {
        let form = form_json(serde_json::json!({
            "client_id": "client-1",
            "due_date": "2026-03-15",
            "tax_rate": "15",
            "discount_type": "percentage",
            "discount_value": 10,
            "items": [
                { "description": "Bin hire", "quantity": 2, "unit_price": "25.00" },
                { "description": "Green waste", "quantity": "1", "unit_price": 10.0 }
            ]
        }));

        let prepared = form
            .into_draft(TaxRate::from_percentage(dec!(15)), today())
            .unwrap()
            .prepare()
            .unwrap();

        assert_eq!(prepared.invoice_date, today());
        assert_eq!(prepared.totals.rounded().total.amount(), dec!(62.10));
    }

    #[test]
    fn test_form_tax_falls_back_to_default() {
        let form = form_json(serde_json::json!({
            "client_id": "client-1",
            "due_date": "2026-03-15",
            "tax_rate": "-4",
            "items": [{ "description": "Bin", "quantity": 1, "unit_price": 100 }]
        }));

        let d = form.into_draft(TaxRate::from_percentage(dec!(15)), today()).unwrap();
        assert_eq!(d.tax_rate.fraction(), dec!(0.15));
        assert_eq!(d.discount, DiscountPolicy::None);
    }

    #[test]
    fn test_form_rejects_unknown_discount_type() {
        let form = form_json(serde_json::json!({
            "client_id": "client-1",
            "due_date": "2026-03-15",
            "discount_type": "loyalty",
            "items": []
        }));

        let err = form.into_draft(TaxRate::default(), today()).unwrap_err();
        assert!(matches!(err, CoreError::RejectedInput { .. }));
    }

    #[test]
    fn test_prepare_rejects_huge_line_instead_of_overflowing() {
        let form = form_json(serde_json::json!({
            "client_id": "client-1",
            "due_date": "2026-03-15",
            "items": [{
                "description": "Bin hire",
                "quantity": "100000000000000",
                "unit_price": "1000000000000000"
            }]
        }));

        let err = form
            .into_draft(TaxRate::default(), today())
            .unwrap()
            .prepare()
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { ref field, .. } if field == "quantity"));

        let d = draft(vec![LineItemInput::from_form("Bin", "1", "1000000000000000", None)]);
        assert!(matches!(
            d.prepare(),
            Err(ValidationError::TooLarge { ref field, .. }) if field == "unit_price"
        ));
    }

    #[test]
    fn test_prepare_rejects_out_of_range_totals() {
        let mut d = draft(vec![LineItemInput::from_form("Bin", "1", "1000", None)]);
        d.discount = DiscountPolicy::Percentage(Decimal::MAX);

        let err = d.prepare().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidFormat { ref field, .. } if field == "items"
        ));
    }

    #[test]
    fn test_form_rejects_huge_discount_and_tax() {
        let base = serde_json::json!({
            "client_id": "client-1",
            "due_date": "2026-03-15",
            "items": [{ "description": "Bin", "quantity": 1, "unit_price": 100 }]
        });

        let mut discounted = base.clone();
        discounted["discount_type"] = "fixed".into();
        discounted["discount_value"] = "99999999999999999999".into();
        let err = form_json(discounted)
            .into_draft(TaxRate::default(), today())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooLarge { .. })));

        let mut taxed = base;
        taxed["tax_rate"] = "250".into();
        let err = form_json(taxed).into_draft(TaxRate::default(), today()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooLarge { .. })));
    }

    #[test]
    fn test_form_rejects_bad_due_date() {
        let form = form_json(serde_json::json!({
            "client_id": "client-1",
            "due_date": "next week",
            "items": []
        }));

        let err = form.into_draft(TaxRate::default(), today()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::InvalidFormat { .. })));
    }
}
