//! # Invoice Handlers
//!
//! ```text
//! POST /invoices ──► InvoiceForm ──► InvoiceDraft ──► PreparedInvoice ──► tx insert
//!                    (JSON body)     (typed numbers)   (validated, totals)
//!
//! POST /invoices/:id/status ──► StatusChange ──► tx { status, full-total payment }
//!
//! GET  /invoices/:id/statement ──► totals + payments + balance + currency symbol
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use tally_core::draft::{FormNumber, InvoiceForm};
use tally_core::reconcile::{
    derive_payment_state, Balance, PaymentDraft, PaymentState, StatusChange,
};
use tally_core::share::{ShareState, ViewStats};
use tally_core::validation::{normalize_optional, parse_date};
use tally_core::{Client, Invoice, InvoiceItem, InvoiceTotals, Payment};
use tally_db::{Database, InvoiceWithItems, StatusUpdate};

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 500;

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub client_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub method: String,
    /// Defaults to today.
    #[serde(default)]
    pub payment_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: FormNumber,
    pub method: String,
    #[serde(default)]
    pub payment_date: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentRecorded {
    pub payment: Payment,
    pub balance: Balance,
}

/// Invoice with everything an admin screen shows.
#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
    pub balance: Balance,
    pub payment_state: PaymentState,
    pub share_state: ShareState,
    pub share_url: Option<String>,
    pub views: ViewStats,
}

/// What PDF and email renderers consume. Amounts are rounded to cents.
#[derive(Debug, Serialize)]
pub struct Statement {
    pub company_name: String,
    pub currency_symbol: String,
    pub client: Option<Client>,
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub totals: InvoiceTotals,
    pub payments: Vec<Payment>,
    pub balance: Balance,
    pub payment_state: PaymentState,
    pub share_url: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /invoices`
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(form): Json<InvoiceForm>,
) -> ApiResult<(StatusCode, Json<InvoiceWithItems>)> {
    debug!(client_id = %form.client_id, items = form.items.len(), "create_invoice");

    let today = Utc::now().date_naive();
    let prepared = form.into_draft(state.config.default_tax(), today)?.prepare()?;

    if state.db.clients().get_by_id(&prepared.client_id).await?.is_none() {
        return Err(ApiError::not_found("Client", &prepared.client_id));
    }

    let created = state.db.invoices().create(&prepared).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /invoices?client_id=&limit=`
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let invoices = state
        .db
        .invoices()
        .list(query.client_id.as_deref(), limit)
        .await?;
    Ok(Json(invoices))
}

/// `GET /invoices/:id`
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<InvoiceDetail>> {
    let InvoiceWithItems { invoice, items } =
        state.db.invoices().load_invoice_with_items(&id).await?;
    let payments = state.db.payments().load_payments_for_invoice(&id).await?;

    let now = Utc::now();
    let balance = Balance::from_payments(invoice.total, &payments);
    let payment_state = derive_payment_state(
        invoice.status,
        invoice.due_date,
        balance.paid_amount,
        invoice.total,
        now.date_naive(),
    );

    Ok(Json(InvoiceDetail {
        share_state: invoice.share_state(now),
        share_url: invoice.share_link().map(|link| link.url(&state.config.base_url)),
        views: invoice.view_stats(),
        invoice,
        items,
        payments,
        balance,
        payment_state,
    }))
}

/// `POST /invoices/:id/status`
///
/// An unknown status is rejected before anything is written.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<StatusUpdate>> {
    let payment_date = date_or_today("payment_date", request.payment_date.as_deref())?;
    let change = StatusChange::parse(&request.status, &request.method, payment_date)?;

    let update = state.db.invoices().update_status(&id, &change).await?;
    info!(
        invoice_id = %id,
        status = %update.invoice.status.as_str(),
        payment_booked = update.payment.is_some(),
        "Invoice status changed"
    );
    Ok(Json(update))
}

/// `POST /invoices/:id/payments`: records one payment without touching
/// the status.
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentRecorded>)> {
    let amount = request
        .amount
        .positive()
        .ok_or_else(|| ApiError::validation("amount must be a positive number"))?;
    let method = request.method.trim();
    if method.is_empty() {
        return Err(ApiError::validation("method is required"));
    }
    let payment_date = date_or_today("payment_date", request.payment_date.as_deref())?;

    let invoice = state.db.invoices().get(&id).await?;
    let payment = state
        .db
        .payments()
        .append_payment(&PaymentDraft {
            invoice_id: invoice.id.clone(),
            amount: amount.into(),
            method: method.to_string(),
            payment_date,
            transaction_id: normalize_optional(request.transaction_id.as_deref()),
            notes: normalize_optional(request.notes.as_deref()),
        })
        .await?;

    let payments = state.db.payments().load_payments_for_invoice(&id).await?;
    let balance = Balance::from_payments(invoice.total, &payments);
    Ok((StatusCode::CREATED, Json(PaymentRecorded { payment, balance })))
}

/// `GET /invoices/:id/statement`
pub async fn statement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Statement>> {
    Ok(Json(build_statement(&state, &id).await?))
}

// =============================================================================
// Helpers
// =============================================================================

/// Assembles the statement for one invoice.
pub async fn build_statement(state: &AppState, invoice_id: &str) -> ApiResult<Statement> {
    let db: &Database = &state.db;
    let InvoiceWithItems { invoice, items } =
        db.invoices().load_invoice_with_items(invoice_id).await?;
    let payments = db.payments().load_payments_for_invoice(invoice_id).await?;
    let client = db.clients().get_by_id(&invoice.client_id).await?;

    let balance = Balance::from_payments(invoice.total, &payments);
    let payment_state = derive_payment_state(
        invoice.status,
        invoice.due_date,
        balance.paid_amount,
        invoice.total,
        Utc::now().date_naive(),
    );

    Ok(Statement {
        company_name: state.config.company_name.clone(),
        currency_symbol: state.config.currency_symbol.clone(),
        client,
        totals: invoice.totals().rounded(),
        share_url: invoice.share_link().map(|link| link.url(&state.config.base_url)),
        invoice,
        items,
        payments,
        balance: balance.rounded(),
        payment_state,
    })
}

pub(crate) fn date_or_today(field: &str, raw: Option<&str>) -> ApiResult<NaiveDate> {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => Ok(parse_date(field, raw)?),
        _ => Ok(Utc::now().date_naive()),
    }
}
