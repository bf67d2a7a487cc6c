//! # Report Handlers
//!
//! Every range endpoint takes `?from=YYYY-MM-DD&to=YYYY-MM-DD`. A missing
//! `from` means January 1st of the current year; a missing `to` means today.
//! The outstanding report is the exception: without bounds it covers every
//! invoice ever issued.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::services::invoice_service::date_or_today;
use crate::state::AppState;
use tally_core::validation::parse_date;
use tally_db::{
    ClientHistory, MethodTotals, MonthlyTotals, OutstandingReport, PaymentHistoryEntry,
    ReportSummary,
};

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RangeQuery {
    /// Inclusive date range, defaulting to year-to-date.
    pub fn resolve(&self) -> ApiResult<(NaiveDate, NaiveDate)> {
        let to = date_or_today("to", self.to.as_deref())?;
        let from = match self.from.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_date("from", raw)?,
            _ => NaiveDate::from_ymd_opt(Utc::now().year(), 1, 1)
                .ok_or_else(|| ApiError::internal("calendar year has no January 1st"))?,
        };

        check_order(from, to)?;
        Ok((from, to))
    }

    /// Only the bounds actually given; nothing defaults.
    pub fn resolve_open(&self) -> ApiResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        let from = optional_date("from", self.from.as_deref())?;
        let to = optional_date("to", self.to.as_deref())?;
        if let (Some(from), Some(to)) = (from, to) {
            check_order(from, to)?;
        }
        Ok((from, to))
    }
}

fn optional_date(field: &str, raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => Ok(Some(parse_date(field, raw)?)),
        _ => Ok(None),
    }
}

fn check_order(from: NaiveDate, to: NaiveDate) -> ApiResult<()> {
    if from > to {
        return Err(ApiError::validation(format!("from {from} is after to {to}")));
    }
    Ok(())
}

/// `GET /reports/summary`
pub async fn summary(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<ReportSummary>> {
    let (from, to) = range.resolve()?;
    Ok(Json(state.db.reports().summary(from, to).await?))
}

/// `GET /reports/monthly`
pub async fn monthly(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<MonthlyTotals>>> {
    let (from, to) = range.resolve()?;
    Ok(Json(state.db.reports().monthly(from, to).await?))
}

/// `GET /reports/outstanding`: invoices with a positive balance as of today,
/// optionally limited by invoice date.
pub async fn outstanding(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<OutstandingReport>> {
    let (from, to) = range.resolve_open()?;
    Ok(Json(state.db.reports().outstanding_now(from, to).await?))
}

/// `GET /reports/clients`
pub async fn client_history(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<ClientHistory>>> {
    let (from, to) = range.resolve()?;
    Ok(Json(state.db.reports().client_history(from, to).await?))
}

/// `GET /reports/payment-history`
pub async fn payment_history(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<PaymentHistoryEntry>>> {
    let (from, to) = range.resolve()?;
    Ok(Json(state.db.reports().payment_history(from, to).await?))
}

/// `GET /reports/payments`
pub async fn payments_by_method(
    State(state): State<AppState>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Json<Vec<MethodTotals>>> {
    let (from, to) = range.resolve()?;
    Ok(Json(state.db.reports().payments_by_method(from, to).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_range() {
        let range = RangeQuery {
            from: Some("2026-01-01".to_string()),
            to: Some("2026-03-31".to_string()),
        };
        let (from, to) = range.resolve().unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
    }

    #[test]
    fn test_default_range_is_year_to_date() {
        let (from, to) = RangeQuery::default().resolve().unwrap();
        assert_eq!(from.ordinal(), 1);
        assert_eq!(from.year(), to.year());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let range = RangeQuery {
            from: Some("2026-04-01".to_string()),
            to: Some("2026-03-01".to_string()),
        };
        assert!(range.resolve().is_err());
        let bad = RangeQuery {
            from: Some("April".to_string()),
            to: None,
        };
        assert!(bad.resolve().is_err());
    }

    #[test]
    fn test_open_range_keeps_missing_bounds() {
        assert_eq!(RangeQuery::default().resolve_open().unwrap(), (None, None));

        let from_only = RangeQuery {
            from: Some("2026-02-01".to_string()),
            to: Some(" ".to_string()),
        };
        let (from, to) = from_only.resolve_open().unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2026, 2, 1));
        assert_eq!(to, None);

        let inverted = RangeQuery {
            from: Some("2026-04-01".to_string()),
            to: Some("2026-03-01".to_string()),
        };
        assert!(inverted.resolve_open().is_err());
    }
}
