//! # Share Link Handlers
//!
//! ## Public Access Flow
//! ```text
//! GET /public/invoices/:token
//!      │
//!      ▼
//! ShareToken::parse ──── not 64 hex ────────────────► 404 INVALID_LINK
//!      │
//!      ▼
//! find_by_share_token ── no match ──────────────────► 404 INVALID_LINK
//!      │
//!      ▼
//! check_access(now) ──── now > expires_at ──────────► 410 LINK_EXPIRED
//!      │                                               (no view recorded)
//!      ▼
//! increment_view_count (one UPDATE ... RETURNING)
//!      │
//!      ▼
//! invoice + items + payments + totals + balance ────► 200
//! ```

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::state::AppState;
use tally_core::reconcile::{derive_payment_state, Balance, PaymentState};
use tally_core::share::ShareToken;
use tally_core::{CoreError, InvoiceItem, InvoiceStatus, InvoiceTotals, Payment};

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub token: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The unauthenticated invoice page. Carries no internal identifiers.
#[derive(Debug, Serialize)]
pub struct PublicInvoiceView {
    pub company_name: String,
    pub currency_symbol: String,
    pub client_name: Option<String>,
    pub client_company: Option<String>,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub status: InvoiceStatus,
    pub payment_state: PaymentState,
    pub items: Vec<PublicItem>,
    pub totals: InvoiceTotals,
    pub payments: Vec<PublicPayment>,
    pub balance: Balance,
    /// Set when the link expires within a week.
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PublicItem {
    pub description: String,
    pub quantity: rust_decimal::Decimal,
    pub unit_price: tally_core::Money,
    pub line_total: tally_core::Money,
    pub work_details: Option<String>,
}

impl From<InvoiceItem> for PublicItem {
    fn from(item: InvoiceItem) -> Self {
        PublicItem {
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price.rounded(),
            line_total: item.line_total.rounded(),
            work_details: item.work_details,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicPayment {
    pub amount: tally_core::Money,
    pub method: String,
    pub payment_date: NaiveDate,
}

impl From<Payment> for PublicPayment {
    fn from(payment: Payment) -> Self {
        PublicPayment {
            amount: payment.amount.rounded(),
            method: payment.method,
            payment_date: payment.payment_date,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /invoices/:id/share`
///
/// Returns the existing link unchanged when one was already issued.
pub async fn share_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ShareResponse>> {
    let link = state
        .db
        .shares()
        .ensure_share_token(&id, state.config.share_lifetime(), Utc::now())
        .await?;

    Ok(Json(ShareResponse {
        url: link.url(&state.config.base_url),
        token: link.token.into_string(),
        created_at: link.created_at,
        expires_at: link.expires_at,
    }))
}

/// `GET /public/invoices/:token`
pub async fn public_invoice(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> ApiResult<Json<PublicInvoiceView>> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let ip = viewer_ip(&headers, peer, state.config.trust_forwarded_for);
    let view = open_public(&state, &token, ip.as_deref(), Utc::now()).await?;
    Ok(Json(view))
}

// =============================================================================
// Public Access
// =============================================================================

/// Resolves a public token into the invoice page and records the view.
pub async fn open_public(
    state: &AppState,
    raw_token: &str,
    viewer_ip: Option<&str>,
    now: DateTime<Utc>,
) -> ApiResult<PublicInvoiceView> {
    let token = ShareToken::parse(raw_token)?;
    let invoice = state
        .db
        .invoices()
        .find_by_share_token(&token)
        .await?
        .ok_or(CoreError::InvalidToken)?;
    let link = invoice.share_link().ok_or(CoreError::InvalidToken)?;

    if let Err(e) = link.check_access(now) {
        debug!(token = ?token, "Expired share link requested");
        return Err(e.into());
    }

    let views = state
        .db
        .shares()
        .increment_view_count(&invoice.id, viewer_ip, now)
        .await?;
    info!(invoice_id = %invoice.id, view_count = views.view_count, "Public invoice viewed");

    let items = state.db.invoices().items_for(&invoice.id).await?;
    let payments = state.db.payments().load_payments_for_invoice(&invoice.id).await?;
    let client = state.db.clients().get_by_id(&invoice.client_id).await?;

    let balance = Balance::from_payments(invoice.total, &payments);
    let payment_state = derive_payment_state(
        invoice.status,
        invoice.due_date,
        balance.paid_amount,
        invoice.total,
        now.date_naive(),
    );

    Ok(PublicInvoiceView {
        company_name: state.config.company_name.clone(),
        currency_symbol: state.config.currency_symbol.clone(),
        client_name: client.as_ref().map(|c| c.name.clone()),
        client_company: client.and_then(|c| c.company),
        totals: invoice.totals().rounded(),
        invoice_number: invoice.invoice_number,
        invoice_date: invoice.invoice_date,
        due_date: invoice.due_date,
        notes: invoice.notes,
        status: invoice.status,
        payment_state,
        items: items.into_iter().map(PublicItem::from).collect(),
        payments: payments.into_iter().map(PublicPayment::from).collect(),
        balance: balance.rounded(),
        expires_in_days: link.expiry_notice(now),
    })
}

/// The socket peer, or the first `X-Forwarded-For` hop when a proxy is trusted.
pub fn viewer_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> Option<String> {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string)
    };

    trust_forwarded_for
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}
