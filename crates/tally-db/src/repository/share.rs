//! # Share Repository
//!
//! Persistence for share tokens and public view tracking.
//!
//! ## Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  First share, two requests racing                                       │
//! │                                                                         │
//! │  A: UPDATE ... SET share_token = tA WHERE id = ? AND share_token IS NULL│
//! │  B: UPDATE ... SET share_token = tB WHERE id = ? AND share_token IS NULL│
//! │       │                                                                 │
//! │       ▼  SQLite serialises writers: one update matches, one is a no-op │
//! │                                                                         │
//! │  A, B: SELECT share_token ...  → both read the winner's token          │
//! │                                                                         │
//! │  Public view                                                            │
//! │  UPDATE ... SET view_count = view_count + 1 ... RETURNING ...          │
//! │  (increment in place: N concurrent views give view_count == N)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use tally_core::share::{ShareLink, ShareToken, ViewStats};

#[derive(Debug, FromRow)]
struct LinkRow {
    share_token: Option<String>,
    share_token_created_at: Option<DateTime<Utc>>,
    share_token_expires_at: Option<DateTime<Utc>>,
}

impl LinkRow {
    fn into_link(self) -> DbResult<Option<ShareLink>> {
        match (self.share_token, self.share_token_created_at, self.share_token_expires_at) {
            (Some(token), Some(created_at), Some(expires_at)) => Ok(Some(ShareLink {
                token: ShareToken::parse(&token)
                    .map_err(|_| DbError::corrupt("invoices.share_token", token))?,
                created_at,
                expires_at,
            })),
            (None, None, None) => Ok(None),
            _ => Err(DbError::corrupt("invoices.share_token", "partial share link")),
        }
    }
}

#[derive(Debug, FromRow)]
struct ViewRow {
    view_count: i64,
    viewed_at: Option<DateTime<Utc>>,
    last_viewed_at: Option<DateTime<Utc>>,
    last_viewed_ip: Option<String>,
}

impl From<ViewRow> for ViewStats {
    fn from(row: ViewRow) -> Self {
        ViewStats {
            view_count: row.view_count,
            first_viewed_at: row.viewed_at,
            last_viewed_at: row.last_viewed_at,
            last_viewed_ip: row.last_viewed_ip,
        }
    }
}

/// Repository for share links and view counters.
#[derive(Debug, Clone)]
pub struct ShareRepository {
    pool: SqlitePool,
}

impl ShareRepository {
    /// Creates a new ShareRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShareRepository { pool }
    }

    /// The link issued for an invoice, if any.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Invoice doesn't exist
    pub async fn current_link(&self, invoice_id: &str) -> DbResult<Option<ShareLink>> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT share_token, share_token_created_at, share_token_expires_at
            FROM invoices WHERE id = ?1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        row.into_link()
    }

    /// Stores `link` only if the invoice has no token yet.
    ///
    /// ## Returns
    /// * `Ok(true)` - This call issued the token
    /// * `Ok(false)` - A token already existed; nothing changed
    pub async fn save_share_token(&self, invoice_id: &str, link: &ShareLink) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                share_token = ?2,
                share_token_created_at = ?3,
                share_token_expires_at = ?4,
                updated_at = ?3
            WHERE id = ?1 AND share_token IS NULL
            "#,
        )
        .bind(invoice_id)
        .bind(link.token.as_str())
        .bind(link.created_at)
        .bind(link.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Returns the invoice's link, issuing one on first request.
    ///
    /// An existing link is returned unchanged: no new token, no expiry
    /// extension. Concurrent first calls all return the same token.
    pub async fn ensure_share_token(
        &self,
        invoice_id: &str,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> DbResult<ShareLink> {
        if let Some(link) = self.current_link(invoice_id).await? {
            debug!(invoice_id = %invoice_id, "Reusing share link");
            return Ok(link);
        }

        let candidate = ShareLink::issue(now, lifetime);
        if self.save_share_token(invoice_id, &candidate).await? {
            info!(
                invoice_id = %invoice_id,
                expires_at = %candidate.expires_at,
                "Share link issued"
            );
        }

        // Winner or not, the stored token is the answer
        self.current_link(invoice_id)
            .await?
            .ok_or_else(|| {
                DbError::Internal(format!("share token missing for invoice {invoice_id}"))
            })
    }

    /// Records one public view and returns the updated counters.
    ///
    /// The first view sets `viewed_at`; every view bumps the count and
    /// overwrites the last-view time and origin.
    pub async fn increment_view_count(
        &self,
        invoice_id: &str,
        viewer_ip: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<ViewStats> {
        let row = sqlx::query_as::<_, ViewRow>(
            r#"
            UPDATE invoices SET
                view_count = view_count + 1,
                viewed_at = COALESCE(viewed_at, ?2),
                last_viewed_at = ?2,
                last_viewed_ip = ?3
            WHERE id = ?1
            RETURNING view_count, viewed_at, last_viewed_at, last_viewed_ip
            "#,
        )
        .bind(invoice_id)
        .bind(now)
        .bind(viewer_ip)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        debug!(invoice_id = %invoice_id, view_count = row.view_count, "Public view recorded");
        Ok(row.into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
