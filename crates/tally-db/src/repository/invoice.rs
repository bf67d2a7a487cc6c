//! # Invoice Repository
//!
//! Database operations for invoices and their line items.
//!
//! ## Creation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. UPSERT invoice_sequences (year) → last_value + 1  (write lock)      │
//! │     → invoice_number = INV-{YYYY}-{NNNNNN}                              │
//! │                                                                         │
//! │  2. INSERT INTO invoices (... totals computed by tally-core ...)        │
//! │                                                                         │
//! │  3. INSERT INTO invoice_items × N   (position 0..N)                     │
//! │                                                                         │
//! │  COMMIT ← invoice never exists without its items                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both transactions here write first, so SQLite takes the write lock up
//! front and concurrent writers wait on the busy timeout instead of failing
//! on a lock upgrade.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::payment::insert_payment;
use super::{decimal_column, decimal_text, money_column, tax_rate_column};
use crate::error::{DbError, DbResult};
use tally_core::draft::PreparedInvoice;
use tally_core::reconcile::StatusChange;
use tally_core::share::ShareToken;
use tally_core::{
    DiscountType, Invoice, InvoiceItem, InvoiceStatus, InvoiceTotals, Payment,
};

pub(crate) const INVOICE_COLUMNS: &str = "id, client_id, invoice_number, invoice_date, due_date, \
     notes, tax_rate, discount_type, discount_value, subtotal, discount_amount, tax_amount, \
     total, status, share_token, share_token_created_at, share_token_expires_at, view_count, \
     viewed_at, last_viewed_at, last_viewed_ip, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, invoice_id, position, description, quantity, unit_price, \
     line_total, work_details, created_at";

/// `INV-2026-000042`.
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!("INV-{year:04}-{sequence:06}")
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
pub(crate) struct InvoiceRow {
    id: String,
    client_id: String,
    invoice_number: String,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    notes: Option<String>,
    tax_rate: String,
    discount_type: DiscountType,
    discount_value: String,
    subtotal: String,
    discount_amount: String,
    tax_amount: String,
    total: String,
    status: InvoiceStatus,
    share_token: Option<String>,
    share_token_created_at: Option<DateTime<Utc>>,
    share_token_expires_at: Option<DateTime<Utc>>,
    view_count: i64,
    viewed_at: Option<DateTime<Utc>>,
    last_viewed_at: Option<DateTime<Utc>>,
    last_viewed_ip: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> DbResult<Self> {
        Ok(Invoice {
            tax_rate: tax_rate_column("invoices.tax_rate", &row.tax_rate)?,
            discount_value: decimal_column("invoices.discount_value", &row.discount_value)?,
            subtotal: money_column("invoices.subtotal", &row.subtotal)?,
            discount_amount: money_column("invoices.discount_amount", &row.discount_amount)?,
            tax_amount: money_column("invoices.tax_amount", &row.tax_amount)?,
            total: money_column("invoices.total", &row.total)?,
            id: row.id,
            client_id: row.client_id,
            invoice_number: row.invoice_number,
            invoice_date: row.invoice_date,
            due_date: row.due_date,
            notes: row.notes,
            discount_type: row.discount_type,
            status: row.status,
            share_token: row.share_token,
            share_token_created_at: row.share_token_created_at,
            share_token_expires_at: row.share_token_expires_at,
            view_count: row.view_count,
            viewed_at: row.viewed_at,
            last_viewed_at: row.last_viewed_at,
            last_viewed_ip: row.last_viewed_ip,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    invoice_id: String,
    position: i64,
    description: String,
    quantity: String,
    unit_price: String,
    line_total: String,
    work_details: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for InvoiceItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> DbResult<Self> {
        Ok(InvoiceItem {
            quantity: decimal_column("invoice_items.quantity", &row.quantity)?,
            unit_price: money_column("invoice_items.unit_price", &row.unit_price)?,
            line_total: money_column("invoice_items.line_total", &row.line_total)?,
            id: row.id,
            invoice_id: row.invoice_id,
            position: row.position,
            description: row.description,
            work_details: row.work_details,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Results
// =============================================================================

/// An invoice with its line items in position order.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithItems {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

/// Outcome of a status update.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub invoice: Invoice,
    /// The payment booked by this update, if the new status books one.
    pub payment: Option<Payment>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Inserts a prepared invoice and its items in one transaction.
    ///
    /// The invoice number is drawn from the per-year counter of the invoice
    /// date inside the same transaction, so numbers are unique and
    /// gap-free per year.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Client doesn't exist
    pub async fn create(&self, prepared: &PreparedInvoice) -> DbResult<InvoiceWithItems> {
        let now = Utc::now();
        let invoice_id = Uuid::new_v4().to_string();
        let year = prepared.invoice_date.year();
        let (discount_type, discount_value) = prepared.discount.parts();
        let totals = &prepared.totals;

        debug!(client_id = %prepared.client_id, items = prepared.items.len(), "Creating invoice");

        let mut tx = self.pool.begin().await?;

        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_sequences (year, last_value) VALUES (?1, 1)
            ON CONFLICT (year) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&mut *tx)
        .await?;

        let invoice_number = format_invoice_number(year, sequence);

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, client_id, invoice_number, invoice_date, due_date, notes,
                tax_rate, discount_type, discount_value,
                subtotal, discount_amount, tax_amount, total,
                status, view_count, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, 0, ?15, ?15
            )
            "#,
        )
        .bind(&invoice_id)
        .bind(&prepared.client_id)
        .bind(&invoice_number)
        .bind(prepared.invoice_date)
        .bind(prepared.due_date)
        .bind(&prepared.notes)
        .bind(decimal_text(prepared.tax_rate.fraction()))
        .bind(discount_type)
        .bind(decimal_text(discount_value))
        .bind(decimal_text(totals.subtotal.amount()))
        .bind(decimal_text(totals.discount_amount.amount()))
        .bind(decimal_text(totals.tax_amount.amount()))
        .bind(decimal_text(totals.total.amount()))
        .bind(InvoiceStatus::Unpaid)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(prepared.items.len());
        for item in &prepared.items {
            let stored = InvoiceItem {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice_id.clone(),
                position: item.position,
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total,
                work_details: item.work_details.clone(),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, position, description, quantity,
                    unit_price, line_total, work_details, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&stored.id)
            .bind(&stored.invoice_id)
            .bind(stored.position)
            .bind(&stored.description)
            .bind(decimal_text(stored.quantity))
            .bind(decimal_text(stored.unit_price.amount()))
            .bind(decimal_text(stored.line_total.amount()))
            .bind(&stored.work_details)
            .bind(stored.created_at)
            .execute(&mut *tx)
            .await?;

            items.push(stored);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            invoice_id = %invoice_id,
            invoice_number = %invoice_number,
            total = %totals.total,
            "Invoice created"
        );

        let invoice = Invoice {
            id: invoice_id,
            client_id: prepared.client_id.clone(),
            invoice_number,
            invoice_date: prepared.invoice_date,
            due_date: prepared.due_date,
            notes: prepared.notes.clone(),
            tax_rate: prepared.tax_rate,
            discount_type,
            discount_value,
            subtotal: totals.subtotal,
            discount_amount: totals.discount_amount,
            tax_amount: totals.tax_amount,
            total: totals.total,
            status: InvoiceStatus::Unpaid,
            share_token: None,
            share_token_created_at: None,
            share_token_expires_at: None,
            view_count: 0,
            viewed_at: None,
            last_viewed_at: None,
            last_viewed_ip: None,
            created_at: now,
            updated_at: now,
        };

        Ok(InvoiceWithItems { invoice, items })
    }

    /// Gets an invoice by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Invoice::try_from).transpose()
    }

    /// Gets an invoice by its ID, failing with `NotFound` when absent.
    pub async fn get(&self, id: &str) -> DbResult<Invoice> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    /// Looks up the invoice a share token was issued for.
    pub async fn find_by_share_token(&self, token: &ShareToken) -> DbResult<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE share_token = ?1"
        ))
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Invoice::try_from).transpose()
    }

    /// Line items of an invoice in position order.
    pub async fn items_for(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ?1 ORDER BY position"
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InvoiceItem::try_from).collect()
    }

    /// Loads an invoice together with its items.
    pub async fn load_invoice_with_items(&self, id: &str) -> DbResult<InvoiceWithItems> {
        let invoice = self.get(id).await?;
        let items = self.items_for(id).await?;
        debug!(invoice_id = %id, items = items.len(), "Loaded invoice");
        Ok(InvoiceWithItems { invoice, items })
    }

    /// Invoices newest first, optionally for one client.
    pub async fn list(&self, client_id: Option<&str>, limit: u32) -> DbResult<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE (?1 IS NULL OR client_id = ?1) \
             ORDER BY invoice_date DESC, invoice_number DESC LIMIT ?2"
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Invoice::try_from).collect()
    }

    /// Overwrites the persisted totals. Idempotent.
    pub async fn save_invoice_totals(&self, id: &str, totals: &InvoiceTotals) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                subtotal = ?2,
                discount_amount = ?3,
                tax_amount = ?4,
                total = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(decimal_text(totals.subtotal.amount()))
        .bind(decimal_text(totals.discount_amount.amount()))
        .bind(decimal_text(totals.tax_amount.amount()))
        .bind(decimal_text(totals.total.amount()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        debug!(invoice_id = %id, total = %totals.total, "Saved invoice totals");
        Ok(())
    }

    /// Re-runs the calculator over the stored items and saves the result.
    pub async fn recompute_totals(&self, id: &str) -> DbResult<InvoiceTotals> {
        let loaded = self.load_invoice_with_items(id).await?;
        let totals = InvoiceTotals::for_items(
            &loaded.items,
            &loaded.invoice.discount(),
            loaded.invoice.tax_rate,
        );
        self.save_invoice_totals(id, &totals).await?;
        Ok(totals)
    }

    /// Sets the status column only.
    pub async fn set_invoice_status(&self, id: &str, status: InvoiceStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        info!(invoice_id = %id, status = %status, "Invoice status set");
        Ok(())
    }

    /// Applies a status change and books its payment in one transaction.
    ///
    /// ```text
    /// BEGIN
    ///   UPDATE invoices SET status = ? ... RETURNING total
    ///   INSERT INTO payments (amount = total)   ← paid / partially_paid only
    /// COMMIT
    /// ```
    pub async fn update_status(&self, id: &str, change: &StatusChange) -> DbResult<StatusUpdate> {
        let mut tx = self.pool.begin().await?;

        let total: Option<String> = sqlx::query_scalar(
            "UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING total",
        )
        .bind(id)
        .bind(change.status)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(total) = total else {
            return Err(DbError::not_found("Invoice", id));
        };
        let total = money_column("invoices.total", &total)?;

        let payment = match change.booked_payment(id, total) {
            Some(draft) => Some(insert_payment(&mut *tx, &draft).await?),
            None => None,
        };

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            invoice_id = %id,
            status = %change.status,
            payment_booked = payment.is_some(),
            "Invoice status updated"
        );

        let invoice = self.get(id).await?;
        Ok(StatusUpdate { invoice, payment })
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
    use tally_core::Money;

    fn money(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2))
    }

    #[test]
    fn test_format_invoice_number() {
        assert_eq!(format_invoice_number(2026, 42), "INV-2026-000042");
    }

    #[tokio::test]
    async fn test_create_and_load_round_trip() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;

        let created = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        let loaded = db.invoices().load_invoice_with_items(&created.invoice.id).await.unwrap();

        let inv = &loaded.invoice;
        assert_eq!(inv.invoice_number, "INV-2026-000001");
        assert_eq!(inv.status, InvoiceStatus::Unpaid);
        assert_eq!(inv.discount_type, DiscountType::Percentage);
        assert_eq!(inv.tax_rate.fraction(), Decimal::new(15, 2));
        assert_eq!(inv.subtotal, money(6000));
        assert_eq!(inv.discount_amount, money(600));
        assert_eq!(inv.tax_amount, money(810));
        assert_eq!(inv.total, money(6210));
        assert_eq!(inv.view_count, 0);
        assert!(inv.share_token.is_none());

        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].description, "Skip bin hire");
        assert_eq!(loaded.items[1].work_details.as_deref(), Some("Two trailer loads"));
    }

    #[tokio::test]
    async fn test_invoice_numbers_sequential_per_year() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let repo = db.invoices();

        let a = repo.create(&prepared(&c.id, date(2026, 1, 5))).await.unwrap();
        let b = repo.create(&prepared(&c.id, date(2026, 6, 5))).await.unwrap();
        let next_year = repo.create(&prepared(&c.id, date(2027, 1, 2))).await.unwrap();

        assert_eq!(a.invoice.invoice_number, "INV-2026-000001");
        assert_eq!(b.invoice.invoice_number, "INV-2026-000002");
        assert_eq!(next_year.invoice.invoice_number, "INV-2027-000001");
    }

    #[tokio::test]
    async fn test_create_for_unknown_client_writes_nothing() {
        let db = database().await;
        let err = db.invoices().create(&prepared("missing", date(2026, 3, 1))).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        // Counter rolled back with the failed transaction
        let c = client(&db, "a@example.com").await;
        let ok = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        assert_eq!(ok.invoice.invoice_number, "INV-2026-000001");
    }

    #[tokio::test]
    async fn test_get_missing_invoice() {
        let db = database().await;
        assert!(db.invoices().get_by_id("missing").await.unwrap().is_none());
        assert!(db.invoices().get("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_recompute_totals_is_idempotent() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let created = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        let id = &created.invoice.id;

        // Damage the stored totals, then recompute twice
        db.invoices().save_invoice_totals(id, &InvoiceTotals::default()).await.unwrap();
        let first = db.invoices().recompute_totals(id).await.unwrap();
        let second = db.invoices().recompute_totals(id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(db.invoices().get(id).await.unwrap().total, money(6210));
    }

    #[tokio::test]
    async fn test_paid_status_books_full_total() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let created = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        let id = &created.invoice.id;

        let change = StatusChange::parse("paid", "Bank Transfer", date(2026, 3, 10)).unwrap();
        let update = db.invoices().update_status(id, &change).await.unwrap();

        assert_eq!(update.invoice.status, InvoiceStatus::Paid);
        let payment = update.payment.unwrap();
        assert_eq!(payment.amount, money(6210));
        assert_eq!(payment.method, "Bank Transfer");

        let history = db.payments().load_payments_for_invoice(id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_overdue_status_books_nothing() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let created = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        let id = &created.invoice.id;

        let change = StatusChange::parse("overdue", "", date(2026, 3, 10)).unwrap();
        let update = db.invoices().update_status(id, &change).await.unwrap();

        assert_eq!(update.invoice.status, InvoiceStatus::Overdue);
        assert!(update.payment.is_none());
        assert!(db.payments().load_payments_for_invoice(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_payment_insert_rolls_back_status() {
        let db = database().await;
        let c = client(&db, "a@example.com").await;
        let created = db.invoices().create(&prepared(&c.id, date(2026, 3, 1))).await.unwrap();
        let id = &created.invoice.id;

        sqlx::query(
            "CREATE TRIGGER fail_payment BEFORE INSERT ON payments \
             BEGIN SELECT RAISE(ABORT, 'payments offline'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let change = StatusChange::parse("paid", "Cash", date(2026, 3, 10)).unwrap();
        assert!(db.invoices().update_status(id, &change).await.is_err());

        let invoice = db.invoices().get(id).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert!(db.payments().load_payments_for_invoice(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status_of_missing_invoice() {
        let db = database().await;
        let change = StatusChange::parse("paid", "Cash", date(2026, 3, 10)).unwrap();
        let err = db.invoices().update_status("missing", &change).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_client() {
        let db = database().await;
        let a = client(&db, "a@example.com").await;
        let b = client(&db, "b@example.com").await;
        db.invoices().create(&prepared(&a.id, date(2026, 3, 1))).await.unwrap();
        db.invoices().create(&prepared(&b.id, date(2026, 3, 2))).await.unwrap();

        assert_eq!(db.invoices().list(None, 50).await.unwrap().len(), 2);
        let for_a = db.invoices().list(Some(&a.id), 50).await.unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].client_id, a.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_distinct_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::repository::test_support::file_database(&dir).await;
        let c = client(&db, "a@example.com").await;

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let db = db.clone();
                let draft = prepared(&c.id, date(2026, 5, 1));
                tokio::spawn(async move { db.invoices().create(&draft).await })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().invoice.invoice_number);
        }
        numbers.sort();
        numbers.dedup();

        assert_eq!(numbers.len(), 12);
        assert_eq!(numbers.first().map(String::as_str), Some("INV-2026-000001"));
        assert_eq!(numbers.last().map(String::as_str), Some("INV-2026-000012"));
    }
}
