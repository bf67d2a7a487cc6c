//! # Report Repository
//!
//! Date-range aggregates over invoices and payments.
//!
//! Rows are fetched as stored TEXT decimals and summed in Rust, so totals
//! stay exact; SQLite's `SUM` would go through floating point.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::money_column;
use crate::error::DbResult;
use tally_core::reconcile::{derive_payment_state, Balance, PaymentState};
use tally_core::{InvoiceStatus, Money};

// =============================================================================
// Report Types
// =============================================================================

/// Invoice sums for a period plus payments received in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub invoice_count: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub payments_received: Money,
}

/// Invoice sums for one `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotals {
    pub month: String,
    pub invoice_count: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl MonthlyTotals {
    fn empty(month: String) -> Self {
        MonthlyTotals {
            month,
            invoice_count: 0,
            subtotal: Money::ZERO,
            discount: Money::ZERO,
            tax: Money::ZERO,
            total: Money::ZERO,
        }
    }
}

/// An invoice that still expects money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutstandingInvoice {
    pub invoice_id: String,
    pub invoice_number: String,
    pub client_name: String,
    pub client_email: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub payment_state: PaymentState,
    pub total: Money,
    pub paid_amount: Money,
    pub balance_due: Money,
    /// Whole days past the due date; 0 when not yet due.
    pub days_overdue: i64,
}

/// Open invoices with a positive balance, and what they add up to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutstandingReport {
    pub as_of: NaiveDate,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub invoice_count: usize,
    pub total_outstanding: Money,
    /// The part of `total_outstanding` that is past due.
    pub total_overdue: Money,
    pub invoices: Vec<OutstandingInvoice>,
}

/// Payments received through one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodTotals {
    pub method: String,
    pub payment_count: i64,
    pub total: Money,
}

/// Billing history of one client over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientHistory {
    pub client_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub invoice_count: i64,
    pub total_billed: Money,
    pub total_paid: Money,
    pub outstanding_balance: Money,
    pub last_invoice_date: NaiveDate,
}

/// One received payment with the invoice and client it settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentHistoryEntry {
    pub payment_id: String,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub method: String,
    pub transaction_id: Option<String>,
    pub invoice_id: String,
    pub invoice_number: String,
    pub client_name: String,
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct AmountsRow {
    invoice_date: NaiveDate,
    subtotal: String,
    discount_amount: String,
    tax_amount: String,
    total: String,
}

#[derive(Debug, FromRow)]
struct OpenInvoiceRow {
    id: String,
    invoice_number: String,
    client_name: String,
    client_email: String,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    status: InvoiceStatus,
    total: String,
}

#[derive(Debug, FromRow)]
struct PaymentAmountRow {
    group_key: String,
    amount: String,
}

#[derive(Debug, FromRow)]
struct ClientInvoiceRow {
    client_id: String,
    name: String,
    email: String,
    phone: Option<String>,
    invoice_date: NaiveDate,
    total: String,
}

#[derive(Debug, FromRow)]
struct PaymentHistoryRow {
    id: String,
    payment_date: NaiveDate,
    amount: String,
    method: String,
    transaction_id: Option<String>,
    invoice_id: String,
    invoice_number: String,
    client_name: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    async fn invoice_amounts(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<AmountsRow>> {
        let rows = sqlx::query_as::<_, AmountsRow>(
            r#"
            SELECT invoice_date, subtotal, discount_amount, tax_amount, total
            FROM invoices
            WHERE invoice_date BETWEEN ?1 AND ?2
            ORDER BY invoice_date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        debug!(%from, %to, count = rows.len(), "Fetched invoice amounts");
        Ok(rows)
    }

    /// Invoice totals for invoices dated in `[from, to]`, plus payments
    /// dated in the same range.
    pub async fn summary(&self, from: NaiveDate, to: NaiveDate) -> DbResult<ReportSummary> {
        let mut summary = ReportSummary {
            from,
            to,
            invoice_count: 0,
            subtotal: Money::ZERO,
            discount: Money::ZERO,
            tax: Money::ZERO,
            total: Money::ZERO,
            payments_received: Money::ZERO,
        };

        for row in self.invoice_amounts(from, to).await? {
            summary.invoice_count += 1;
            summary.subtotal += money_column("invoices.subtotal", &row.subtotal)?;
            summary.discount += money_column("invoices.discount_amount", &row.discount_amount)?;
            summary.tax += money_column("invoices.tax_amount", &row.tax_amount)?;
            summary.total += money_column("invoices.total", &row.total)?;
        }

        for row in self.payment_amounts(from, to).await? {
            summary.payments_received += money_column("payments.amount", &row.amount)?;
        }

        Ok(summary)
    }

    /// The summary sums grouped by `YYYY-MM`, oldest month first. Months
    /// without invoices are omitted.
    pub async fn monthly(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<MonthlyTotals>> {
        let mut months: BTreeMap<String, MonthlyTotals> = BTreeMap::new();

        for row in self.invoice_amounts(from, to).await? {
            let month = row.invoice_date.format("%Y-%m").to_string();
            let entry = months
                .entry(month.clone())
                .or_insert_with(|| MonthlyTotals::empty(month));

            entry.invoice_count += 1;
            entry.subtotal += money_column("invoices.subtotal", &row.subtotal)?;
            entry.discount += money_column("invoices.discount_amount", &row.discount_amount)?;
            entry.tax += money_column("invoices.tax_amount", &row.tax_amount)?;
            entry.total += money_column("invoices.total", &row.total)?;
        }

        Ok(months.into_values().collect())
    }

    /// Unpaid, overdue and partially paid invoices that still have a
    /// positive balance, earliest due date first.
    ///
    /// `from`/`to` bound the invoice date; `None` leaves that side open.
    /// `today` decides overdue days and the derived payment state.
    pub async fn outstanding(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> DbResult<OutstandingReport> {
        let invoices = sqlx::query_as::<_, OpenInvoiceRow>(
            r#"
            SELECT i.id, i.invoice_number, c.name AS client_name, c.email AS client_email,
                   i.invoice_date, i.due_date, i.status, i.total
            FROM invoices i
            JOIN clients c ON c.id = i.client_id
            WHERE i.status IN ('unpaid', 'overdue', 'partially_paid')
              AND (?1 IS NULL OR i.invoice_date >= ?1)
              AND (?2 IS NULL OR i.invoice_date <= ?2)
            ORDER BY i.due_date, i.invoice_number
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let payments = sqlx::query_as::<_, PaymentAmountRow>(
            r#"
            SELECT p.invoice_id AS group_key, p.amount
            FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            WHERE i.status IN ('unpaid', 'overdue', 'partially_paid')
              AND (?1 IS NULL OR i.invoice_date >= ?1)
              AND (?2 IS NULL OR i.invoice_date <= ?2)
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut paid: HashMap<String, Vec<Money>> = HashMap::new();
        for row in payments {
            let amount = money_column("payments.amount", &row.amount)?;
            paid.entry(row.group_key).or_default().push(amount);
        }

        let mut report = OutstandingReport {
            as_of: today,
            from,
            to,
            invoice_count: 0,
            total_outstanding: Money::ZERO,
            total_overdue: Money::ZERO,
            invoices: Vec::new(),
        };

        for row in invoices {
            let total = money_column("invoices.total", &row.total)?;
            let payments = paid.remove(&row.id).unwrap_or_default();
            let balance = Balance::from_amounts(total, payments);
            if !balance.balance_due.is_positive() {
                continue;
            }

            let days_overdue = (today - row.due_date).num_days().max(0);
            report.total_outstanding += balance.balance_due;
            if days_overdue > 0 {
                report.total_overdue += balance.balance_due;
            }

            report.invoices.push(OutstandingInvoice {
                payment_state: derive_payment_state(
                    row.status,
                    row.due_date,
                    balance.paid_amount,
                    total,
                    today,
                ),
                invoice_id: row.id,
                invoice_number: row.invoice_number,
                client_name: row.client_name,
                client_email: row.client_email,
                invoice_date: row.invoice_date,
                due_date: row.due_date,
                status: row.status,
                total,
                paid_amount: balance.paid_amount,
                balance_due: balance.balance_due,
                days_overdue,
            });
        }

        report.invoice_count = report.invoices.len();
        debug!(count = report.invoice_count, "Outstanding invoices");
        Ok(report)
    }

    /// [`outstanding`](Self::outstanding) as of today (UTC).
    pub async fn outstanding_now(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<OutstandingReport> {
        self.outstanding(from, to, Utc::now().date_naive()).await
    }

    /// Per-client invoice count, billed, paid and outstanding amounts for
    /// invoices dated in `[from, to]`, biggest total billed first. Clients
    /// without invoices in the range are left out.
    pub async fn client_history(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<ClientHistory>> {
        let invoices = sqlx::query_as::<_, ClientInvoiceRow>(
            r#"
            SELECT c.id AS client_id, c.name, c.email, c.phone, i.invoice_date, i.total
            FROM invoices i
            JOIN clients c ON c.id = i.client_id
            WHERE i.invoice_date BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let payments = sqlx::query_as::<_, PaymentAmountRow>(
            r#"
            SELECT i.client_id AS group_key, p.amount
            FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            WHERE i.invoice_date BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut clients: HashMap<String, ClientHistory> = HashMap::new();
        for row in invoices {
            let total = money_column("invoices.total", &row.total)?;
            let entry = clients.entry(row.client_id.clone()).or_insert_with(|| ClientHistory {
                client_id: row.client_id,
                name: row.name,
                email: row.email,
                phone: row.phone,
                invoice_count: 0,
                total_billed: Money::ZERO,
                total_paid: Money::ZERO,
                outstanding_balance: Money::ZERO,
                last_invoice_date: row.invoice_date,
            });
            entry.invoice_count += 1;
            entry.total_billed += total;
            entry.last_invoice_date = entry.last_invoice_date.max(row.invoice_date);
        }

        for row in payments {
            let amount = money_column("payments.amount", &row.amount)?;
            if let Some(entry) = clients.get_mut(&row.group_key) {
                entry.total_paid += amount;
            }
        }

        let mut history: Vec<ClientHistory> = clients
            .into_values()
            .map(|mut entry| {
                entry.outstanding_balance = entry.total_billed - entry.total_paid;
                entry
            })
            .collect();
        history.sort_by(|a, b| {
            b.total_billed
                .cmp(&a.total_billed)
                .then_with(|| a.name.cmp(&b.name))
        });

        debug!(%from, %to, count = history.len(), "Client history");
        Ok(history)
    }

    /// Payments dated in `[from, to]` with their invoice and client, newest
    /// first.
    pub async fn payment_history(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<PaymentHistoryEntry>> {
        let rows = sqlx::query_as::<_, PaymentHistoryRow>(
            r#"
            SELECT p.id, p.payment_date, p.amount, p.method, p.transaction_id,
                   i.id AS invoice_id, i.invoice_number, c.name AS client_name
            FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            JOIN clients c ON c.id = i.client_id
            WHERE p.payment_date BETWEEN ?1 AND ?2
            ORDER BY p.payment_date DESC, p.rowid DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PaymentHistoryEntry {
                    amount: money_column("payments.amount", &row.amount)?,
                    payment_id: row.id,
                    payment_date: row.payment_date,
                    method: row.method,
                    transaction_id: row.transaction_id,
                    invoice_id: row.invoice_id,
                    invoice_number: row.invoice_number,
                    client_name: row.client_name,
                })
            })
            .collect()
    }

    async fn payment_amounts(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<PaymentAmountRow>> {
        let rows = sqlx::query_as::<_, PaymentAmountRow>(
            r#"
            SELECT method AS group_key, amount
            FROM payments
            WHERE payment_date BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Count and sum of payments per method in `[from, to]`, largest sum
    /// first.
    pub async fn payments_by_method(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<MethodTotals>> {
        let mut methods: BTreeMap<String, MethodTotals> = BTreeMap::new();

        for row in self.payment_amounts(from, to).await? {
            let amount = money_column("payments.amount", &row.amount)?;
            let entry = methods.entry(row.group_key.clone()).or_insert_with(|| MethodTotals {
                method: row.group_key,
                payment_count: 0,
                total: Money::ZERO,
            });
            entry.payment_count += 1;
            entry.total += amount;
        }

        let mut totals: Vec<MethodTotals> = methods.into_values().collect();
        totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.method.cmp(&b.method)));
        Ok(totals)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{client, database, date, prepared};
    use rust_decimal::Decimal;
    use tally_core::reconcile::{PaymentDraft, StatusChange};

    fn money(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2))
    }

    fn payment(invoice_id: &str, cents: i64, method: &str, on: NaiveDate) -> PaymentDraft {
        PaymentDraft {
            invoice_id: invoice_id.to_string(),
            amount: money(cents),
            method: method.to_string(),
            payment_date: on,
            transaction_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_summary_and_monthly() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        db.invoices().create(&prepared(&c.id, date(2026, 3, 20))).await.unwrap();
        db.invoices().create(&prepared(&c.id, date(2026, 4, 2))).await.unwrap();
        db.invoices().create(&prepared(&c.id, date(2026, 5, 9))).await.unwrap();

        let summary = db.reports().summary(date(2026, 3, 1), date(2026, 4, 30)).await.unwrap();
        assert_eq!(summary.invoice_count, 3);
        assert_eq!(summary.subtotal, money(18000));
        assert_eq!(summary.discount, money(1800));
        assert_eq!(summary.tax, money(2430));
        assert_eq!(summary.total, money(18630));
        assert!(summary.payments_received.is_zero());

        let monthly = db.reports().monthly(date(2026, 1, 1), date(2026, 12, 31)).await.unwrap();
        let months: Vec<&str> = monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, ["2026-03", "2026-04", "2026-05"]);
        assert_eq!(monthly[0].invoice_count, 2);
        assert_eq!(monthly[0].total, money(12420));
    }

    #[tokio::test]
    async fn test_outstanding_excludes_paid() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let open = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        let settled = db.invoices().create(&prepared(&c.id, date(2026, 3, 2))).await.unwrap();

        db.payments()
            .append_payment(&payment(&open.invoice.id, 2000, "Cash", date(2026, 3, 5)))
            .await
            .unwrap();
        let change = StatusChange::parse("paid", "Cash", date(2026, 3, 6)).unwrap();
        db.invoices().update_status(&settled.invoice.id, &change).await.unwrap();

        let report = db.reports().outstanding(None, None, date(2026, 3, 10)).await.unwrap();
        assert_eq!(report.invoice_count, 1);
        assert_eq!(report.total_outstanding, money(4210));
        assert!(report.total_overdue.is_zero());

        let row = &report.invoices[0];
        assert_eq!(row.invoice_id, open.invoice.id);
        assert_eq!(row.client_name, "Aroha Ngata");
        assert_eq!(row.client_email, "a@example.com");
        assert_eq!(row.paid_amount, money(2000));
        assert_eq!(row.balance_due, money(4210));
        assert_eq!(row.days_overdue, 0);
        assert_eq!(row.payment_state, PaymentState::PartiallyPaid);

        // Due 2026-03-15
        let later = db.reports().outstanding(None, None, date(2026, 4, 1)).await.unwrap();
        assert_eq!(later.invoices[0].payment_state, PaymentState::Overdue);
        assert_eq!(later.invoices[0].days_overdue, 17);
        assert_eq!(later.total_overdue, money(4210));
    }

    #[tokio::test]
    async fn test_outstanding_skips_settled_balances() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let inv = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();

        // Books the full total while the status stays open
        let change = StatusChange::parse("partially_paid", "Cash", date(2026, 3, 2)).unwrap();
        db.invoices().update_status(&inv.invoice.id, &change).await.unwrap();

        let report = db.reports().outstanding(None, None, date(2026, 3, 3)).await.unwrap();
        assert!(report.invoices.is_empty());
        assert!(report.total_outstanding.is_zero());

        let overpaid = db.invoices().create(&prepared(&c.id, date(2026, 3, 4))).await.unwrap();
        db.payments()
            .append_payment(&payment(&overpaid.invoice.id, 7000, "Card", date(2026, 3, 5)))
            .await
            .unwrap();
        let report = db.reports().outstanding(None, None, date(2026, 3, 6)).await.unwrap();
        assert!(report.invoices.iter().all(|row| row.balance_due.is_positive()));
        assert_eq!(report.invoice_count, 0);
    }

    #[tokio::test]
    async fn test_outstanding_filters_by_invoice_date() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        db.invoices().create(&prepared(&c.id, date(2025, 11, 20))).await.unwrap();
        db.invoices().create(&prepared(&c.id, date(2026, 2, 1))).await.unwrap();
        db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();

        let today = date(2026, 3, 10);
        let all = db.reports().outstanding(None, None, today).await.unwrap();
        assert_eq!(all.invoice_count, 3);
        assert_eq!(all.total_outstanding, money(18630));

        let this_year = db
            .reports()
            .outstanding(Some(date(2026, 1, 1)), None, today)
            .await
            .unwrap();
        assert_eq!(this_year.invoice_count, 2);

        let february = db
            .reports()
            .outstanding(Some(date(2026, 2, 1)), Some(date(2026, 2, 28)), today)
            .await
            .unwrap();
        assert_eq!(february.invoice_count, 1);
        assert_eq!(february.invoices[0].invoice_date, date(2026, 2, 1));
        assert_eq!(february.total_overdue, money(6210));
    }

    #[tokio::test]
    async fn test_client_history() {
        let db = database().await;
        let aroha = client(&db, "a@example.com").await;
        let other = db
            .clients()
            .insert(&tally_core::NewClient {
                name: "Bay Plumbing".to_string(),
                company: None,
                address: None,
                email: "bay@example.com".to_string(),
                phone: Some("021 555 0100".to_string()),
            })
            .await
            .unwrap();
        let idle = client(&db, "idle@example.com").await;

        let first = db.invoices().create(&prepared(&aroha.id, date(2026, 3, 1))).await.unwrap();
        db.invoices().create(&prepared(&aroha.id, date(2026, 3, 9))).await.unwrap();
        db.invoices().create(&prepared(&other.id, date(2026, 3, 4))).await.unwrap();
        db.invoices().create(&prepared(&idle.id, date(2025, 6, 1))).await.unwrap();
        for cents in [2000, 1000] {
            db.payments()
                .append_payment(&payment(&first.invoice.id, cents, "Cash", date(2026, 3, 5)))
                .await
                .unwrap();
        }

        let history = db
            .reports()
            .client_history(date(2026, 3, 1), date(2026, 3, 31))
            .await
            .unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].client_id, aroha.id);
        assert_eq!(history[0].invoice_count, 2);
        assert_eq!(history[0].total_billed, money(12420));
        assert_eq!(history[0].total_paid, money(3000));
        assert_eq!(history[0].outstanding_balance, money(9420));
        assert_eq!(history[0].last_invoice_date, date(2026, 3, 9));

        assert_eq!(history[1].name, "Bay Plumbing");
        assert_eq!(history[1].phone.as_deref(), Some("021 555 0100"));
        assert!(history[1].total_paid.is_zero());
    }

    #[tokio::test]
    async fn test_payment_history_newest_first() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let inv = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        let id = &inv.invoice.id;

        db.payments()
            .append_payment(&payment(id, 1000, "Cash", date(2026, 3, 5)))
            .await
            .unwrap();
        db.payments()
            .append_payment(&payment(id, 2500, "Card", date(2026, 3, 20)))
            .await
            .unwrap();
        db.payments()
            .append_payment(&payment(id, 500, "Cash", date(2026, 4, 2)))
            .await
            .unwrap();

        let march = db
            .reports()
            .payment_history(date(2026, 3, 1), date(2026, 3, 31))
            .await
            .unwrap();
        assert_eq!(march.len(), 2);
        assert_eq!(march[0].payment_date, date(2026, 3, 20));
        assert_eq!(march[0].amount, money(2500));
        assert_eq!(march[0].invoice_number, inv.invoice.invoice_number);
        assert_eq!(march[1].client_name, "Aroha Ngata");
    }

    #[tokio::test]
    async fn test_payments_by_method() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let inv = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        let id = &inv.invoice.id;

        for (cents, method) in [(1000, "Cash"), (2500, "Bank Transfer"), (500, "Cash")] {
            db.payments()
                .append_payment(&payment(id, cents, method, date(2026, 3, 5)))
                .await
                .unwrap();
        }
        db.payments()
            .append_payment(&payment(id, 9900, "Card", date(2026, 5, 1)))
            .await
            .unwrap();

        let totals = db
            .reports()
            .payments_by_method(date(2026, 3, 1), date(2026, 3, 31))
            .await
            .unwrap();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].method, "Bank Transfer");
        assert_eq!(totals[0].total, money(2500));
        assert_eq!(totals[1].method, "Cash");
        assert_eq!(totals[1].payment_count, 2);
        assert_eq!(totals[1].total, money(1500));

        let summary = db.reports().summary(date(2026, 3, 1), date(2026, 3, 31)).await.unwrap();
        assert_eq!(summary.payments_received, money(4000));
    }
}
