//! # Share Links
//!
//! Rules for the public, unauthenticated, token-addressed invoice view.
//!
//! ## Link Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   NoToken ──(first share request)──► Active ──(now > expires_at)──► Expired
//! │                                        │                                │
//! │                                        └── share again: same token,    │
//! │                                            same expiry (never rotated) │
//! │                                                                         │
//! │   Expired is computed at access time from `expires_at`;                │
//! │   there is no stored state flag.                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence (the conditional first-share update and the atomic view
//! increment) lives in `tally-db`; this module only decides.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Random bytes per token (256 bits).
pub const SHARE_TOKEN_BYTES: usize = 32;

/// Hex characters per token.
pub const SHARE_TOKEN_LEN: usize = SHARE_TOKEN_BYTES * 2;

/// Default validity window of a new link.
pub const DEFAULT_SHARE_LINK_DAYS: i64 = 90;

/// The public page warns when this many days or fewer remain.
pub const EXPIRY_NOTICE_DAYS: i64 = 7;

/// Path prefix of the public invoice view.
pub const PUBLIC_INVOICE_PATH: &str = "/public/invoices";

// =============================================================================
// Share Token
// =============================================================================

/// An opaque 64-hex-character link token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShareToken(String);

impl ShareToken {
    /// Draws 256 bits from the operating system CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SHARE_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        ShareToken(hex::encode(bytes))
    }

    /// Accepts exactly 64 hex characters (normalised to lowercase).
    ///
    /// Anything else is `CoreError::InvalidToken`, so malformed input never
    /// reaches the database.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let raw = raw.trim();
        if raw.len() != SHARE_TOKEN_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidToken);
        }
        Ok(ShareToken(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Only a prefix is shown so tokens do not end up whole in logs.
impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareToken({}…)", &self.0[..8.min(self.0.len())])
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Share Link
// =============================================================================

/// An issued link: token plus validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShareLink {
    pub token: ShareToken,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
}

impl ShareLink {
    /// Issues a fresh link valid for `lifetime` from `now`.
    pub fn issue(now: DateTime<Utc>, lifetime: Duration) -> Self {
        ShareLink {
            token: ShareToken::generate(),
            created_at: now,
            expires_at: now + lifetime,
        }
    }

    /// Expired strictly after `expires_at`; the boundary instant is still valid.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Gate for every public read.
    pub fn check_access(&self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_expired(now) {
            return Err(CoreError::ExpiredLink {
                expired_at: self.expires_at,
            });
        }
        Ok(())
    }

    /// Whole days left (floored); negative once expired.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        let remaining = self.expires_at - now;
        let days = remaining.num_days();
        // num_days truncates toward zero; floor for partial negative days
        if remaining < Duration::zero() && remaining != Duration::days(days) {
            days - 1
        } else {
            days
        }
    }

    /// Days remaining when the link expires within the notice window.
    ///
    /// ```rust
    /// use chrono::{Duration, Utc};
    /// use tally_core::share::ShareLink;
    ///
    /// let now = Utc::now();
    /// let link = ShareLink::issue(now, Duration::days(90));
    /// assert_eq!(link.expiry_notice(now), None);
    /// assert_eq!(link.expiry_notice(now + Duration::days(85)), Some(5));
    /// ```
    pub fn expiry_notice(&self, now: DateTime<Utc>) -> Option<i64> {
        let days = self.days_until_expiry(now);
        (days > 0 && days <= EXPIRY_NOTICE_DAYS).then_some(days)
    }

    /// Absolute URL of the public view.
    pub fn url(&self, base_url: &str) -> String {
        share_url(base_url, &self.token)
    }
}

/// `{base_url}/public/invoices/{token}`.
pub fn share_url(base_url: &str, token: &ShareToken) -> String {
    format!(
        "{}{}/{}",
        base_url.trim_end_matches('/'),
        PUBLIC_INVOICE_PATH,
        token.as_str()
    )
}

// =============================================================================
// Share State
// =============================================================================

/// Computed link state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShareState {
    NoToken,
    Active,
    Expired,
}

impl ShareState {
    /// State of an optional link at `now`.
    pub fn of(link: Option<&ShareLink>, now: DateTime<Utc>) -> Self {
        match link {
            None => ShareState::NoToken,
            Some(link) if link.is_expired(now) => ShareState::Expired,
            Some(_) => ShareState::Active,
        }
    }
}

// =============================================================================
// View Tracking
// =============================================================================

/// Public view counters of an invoice.
///
/// Incremented in place by the database on every successful public access;
/// there is no de-duplication window.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ViewStats {
    pub view_count: i64,
    #[ts(as = "Option<String>")]
    pub first_viewed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub last_viewed_ip: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
