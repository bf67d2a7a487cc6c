//! # Payment Repository
//!
//! Append-only payment history. Rows are never updated or deleted, and
//! history is returned in insertion order.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{decimal_text, money_column};
use crate::error::{DbError, DbResult};
use tally_core::reconcile::PaymentDraft;
use tally_core::Payment;

const PAYMENT_COLUMNS: &str =
    "id, invoice_id, amount, method, payment_date, transaction_id, notes, created_at";

#[derive(Debug, FromRow)]
pub(crate) struct PaymentRow {
    id: String,
    invoice_id: String,
    amount: String,
    method: String,
    payment_date: NaiveDate,
    transaction_id: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> DbResult<Self> {
        Ok(Payment {
            amount: money_column("payments.amount", &row.amount)?,
            id: row.id,
            invoice_id: row.invoice_id,
            method: row.method,
            payment_date: row.payment_date,
            transaction_id: row.transaction_id,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// Inserts a payment on any executor (pool or open transaction).
pub(crate) async fn insert_payment<'e, E>(executor: E, draft: &PaymentDraft) -> DbResult<Payment>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        invoice_id: draft.invoice_id.clone(),
        amount: draft.amount,
        method: draft.method.clone(),
        payment_date: draft.payment_date,
        transaction_id: draft.transaction_id.clone(),
        notes: draft.notes.clone(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO payments (
            id, invoice_id, amount, method, payment_date, transaction_id, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.invoice_id)
    .bind(decimal_text(payment.amount.amount()))
    .bind(&payment.method)
    .bind(payment.payment_date)
    .bind(&payment.transaction_id)
    .bind(&payment.notes)
    .bind(payment.created_at)
    .execute(executor)
    .await?;

    info!(
        payment_id = %payment.id,
        invoice_id = %payment.invoice_id,
        amount = %payment.amount,
        "Payment recorded"
    );
    Ok(payment)
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Appends a payment to an invoice's history.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - Invoice doesn't exist
    pub async fn append_payment(&self, draft: &PaymentDraft) -> DbResult<Payment> {
        insert_payment(&self.pool, draft).await
    }

    /// Payment history of one invoice, oldest first.
    pub async fn load_payments_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ?1 ORDER BY rowid"
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(invoice_id = %invoice_id, count = rows.len(), "Loaded payments");
        rows.into_iter().map(Payment::try_from).collect()
    }
}
