//! # Route Table
//!
//! ```text
//! GET  /health
//! POST /clients                    GET /clients          GET /clients/:id
//! POST /services                   GET /services         (?active=true)
//! GET  /services/:id               PUT /services/:id     DELETE /services/:id
//! POST /invoices                   GET /invoices         GET /invoices/:id
//! POST /invoices/:id/status        POST /invoices/:id/payments
//! POST /invoices/:id/share         GET  /invoices/:id/statement
//! GET  /public/invoices/:token     (unauthenticated)
//! GET  /reports/summary | monthly | outstanding | payments
//! GET  /reports/clients | payment-history
//! ```

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::services::{
    catalog_service, client_service, health_service, invoice_service, report_service,
    share_service,
};
use crate::state::AppState;

/// Builds the application router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_service::health))
        .route(
            "/clients",
            post(client_service::create_client).get(client_service::list_clients),
        )
        .route("/clients/:id", get(client_service::get_client))
        .route(
            "/services",
            post(catalog_service::create_service).get(catalog_service::list_services),
        )
        .route(
            "/services/:id",
            get(catalog_service::get_service)
                .put(catalog_service::update_service)
                .delete(catalog_service::delete_service),
        )
        .route(
            "/invoices",
            post(invoice_service::create_invoice).get(invoice_service::list_invoices),
        )
        .route("/invoices/:id", get(invoice_service::get_invoice))
        .route("/invoices/:id/status", post(invoice_service::update_status))
        .route("/invoices/:id/payments", post(invoice_service::record_payment))
        .route("/invoices/:id/share", post(share_service::share_invoice))
        .route("/invoices/:id/statement", get(invoice_service::statement))
        .route("/public/invoices/:token", get(share_service::public_invoice))
        .route("/reports/summary", get(report_service::summary))
        .route("/reports/monthly", get(report_service::monthly))
        .route("/reports/outstanding", get(report_service::outstanding))
        .route("/reports/payments", get(report_service::payments_by_method))
        .route("/reports/clients", get(report_service::client_history))
        .route("/reports/payment-history", get(report_service::payment_history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tally_core::share::ShareLink;
    use tally_db::{Database, DbConfig};
    use tower::ServiceExt;

    /// Router behind a trusted proxy, so `X-Forwarded-For` is honoured.
    async fn app() -> (Router, Database) {
        app_with(true).await
    }

    async fn app_with(trust_forwarded_for: bool) -> (Router, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ServerConfig {
            currency_symbol: "NZ$".to_string(),
            company_name: "Kiwi Rubbish Removal".to_string(),
            base_url: "https://billing.example.com".to_string(),
            trust_forwarded_for,
            ..ServerConfig::default()
        };
        (router(AppState::new(db.clone(), config)), db)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    /// Creates a client and the 2 × 25.00 + 1 × 10.00 invoice (10% off, 15% tax).
    async fn seed_invoice(app: &Router) -> Value {
        let (status, client) = send(
            app,
            "POST",
            "/clients",
            Some(json!({
                "name": "Aroha Ngata",
                "company": "Ngata Builders",
                "email": "aroha@example.com"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, created) = send(
            app,
            "POST",
            "/invoices",
            Some(json!({
                "client_id": client["id"],
                "invoice_date": "2026-03-01",
                "due_date": "2026-03-15",
                "tax_rate": "15",
                "discount_type": "percentage",
                "discount_value": 10,
                "items": [
                    {"description": "Skip bin hire", "quantity": 2, "unit_price": "25.00"},
                    {"description": "Green waste", "quantity": "1", "unit_price": 10},
                    {"description": "Free quote", "quantity": 1, "unit_price": 0}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        created
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], true);
    }

    #[tokio::test]
    async fn test_create_invoice_end_to_end() {
        let (app, _) = app().await;
        let created = seed_invoice(&app).await;

        let invoice = &created["invoice"];
        assert_eq!(invoice["invoice_number"], "INV-2026-000001");
        assert_eq!(decimal(&invoice["subtotal"]), Decimal::new(6000, 2));
        assert_eq!(decimal(&invoice["discount_amount"]), Decimal::new(600, 2));
        assert_eq!(decimal(&invoice["tax_amount"]), Decimal::new(810, 2));
        assert_eq!(decimal(&invoice["total"]), Decimal::new(6210, 2));
        // The zero-price line is not persisted
        assert_eq!(created["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_invoice_without_billable_items() {
        let (app, _) = app().await;
        let (_, client) = send(
            &app,
            "POST",
            "/clients",
            Some(json!({"name": "Liam", "email": "liam@example.com"})),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/invoices",
            Some(json!({
                "client_id": client["id"],
                "due_date": "2099-01-01",
                "items": [{"description": "Nothing", "quantity": "abc", "unit_price": 5}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_duplicate_client_email_conflicts() {
        let (app, _) = app().await;
        let body = json!({"name": "Mere", "email": "mere@example.com"});
        let (first, _) = send(&app, "POST", "/clients", Some(body.clone())).await;
        let (second, error) = send(&app, "POST", "/clients", Some(body)).await;
        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(error["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_invalid_status_changes_nothing() {
        let (app, db) = app().await;
        let created = seed_invoice(&app).await;
        let id = created["invoice"]["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/invoices/{id}/status"),
            Some(json!({"status": "void", "method": "Cash"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let invoice = db.invoices().get(id).await.unwrap();
        assert_eq!(invoice.status, tally_core::InvoiceStatus::Unpaid);
        assert!(db.payments().load_payments_for_invoice(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paid_status_books_full_total() {
        let (app, _) = app().await;
        let created = seed_invoice(&app).await;
        let id = created["invoice"]["id"].as_str().unwrap();

        let (status, update) = send(
            &app,
            "POST",
            &format!("/invoices/{id}/status"),
            Some(json!({
                "status": "paid",
                "method": " Bank Transfer ",
                "payment_date": "2026-03-10"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(update["invoice"]["status"], "paid");
        assert_eq!(update["payment"]["method"], "Bank Transfer");
        assert_eq!(decimal(&update["payment"]["amount"]), Decimal::new(6210, 2));

        let (_, statement) = send(&app, "GET", &format!("/invoices/{id}/statement"), None).await;
        assert_eq!(statement["currency_symbol"], "NZ$");
        assert_eq!(statement["payment_state"], "paid");
        assert_eq!(decimal(&statement["balance"]["balance_due"]), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_partial_payments_reduce_balance() {
        let (app, _) = app().await;
        let created = seed_invoice(&app).await;
        let id = created["invoice"]["id"].as_str().unwrap();

        for amount in ["20", "12.10"] {
            let (status, _) = send(
                &app,
                "POST",
                &format!("/invoices/{id}/payments"),
                Some(json!({"amount": amount, "method": "Cash", "payment_date": "2026-03-05"})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, detail) = send(&app, "GET", &format!("/invoices/{id}"), None).await;
        assert_eq!(decimal(&detail["balance"]["paid_amount"]), Decimal::new(3210, 2));
        assert_eq!(decimal(&detail["balance"]["balance_due"]), Decimal::new(3000, 2));
        assert_eq!(detail["payments"].as_array().unwrap().len(), 2);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/invoices/{id}/payments"),
            Some(json!({"amount": "-5", "method": "Cash"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_share_and_public_view() {
        let (app, db) = app().await;
        let created = seed_invoice(&app).await;
        let id = created["invoice"]["id"].as_str().unwrap();

        let (status, first) = send(&app, "POST", &format!("/invoices/{id}/share"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, second) = send(&app, "POST", &format!("/invoices/{id}/share"), None).await;
        assert_eq!(first["token"], second["token"]);

        let token = first["token"].as_str().unwrap();
        assert_eq!(
            first["url"],
            format!("https://billing.example.com/public/invoices/{token}")
        );

        let (status, page) = send(&app, "GET", &format!("/public/invoices/{token}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["invoice_number"], "INV-2026-000001");
        assert_eq!(page["company_name"], "Kiwi Rubbish Removal");
        assert!(page.get("id").is_none());
        assert!(page.get("views").is_none());
        assert!(page.get("last_viewed_ip").is_none());
        assert_eq!(decimal(&page["totals"]["total"]), Decimal::new(6210, 2));

        send(&app, "GET", &format!("/public/invoices/{token}"), None).await;
        let invoice = db.invoices().get(id).await.unwrap();
        assert_eq!(invoice.view_count, 2);
        assert_eq!(invoice.last_viewed_ip.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_public_link_errors_do_not_leak() {
        let (app, db) = app().await;
        let created = seed_invoice(&app).await;
        let id = created["invoice"]["id"].as_str().unwrap();

        let (status, body) = send(&app, "GET", "/public/invoices/not-a-token", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "INVALID_LINK");

        let unknown = "ab".repeat(32);
        let (status, _) = send(&app, "GET", &format!("/public/invoices/{unknown}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // A link issued 91 days ago with the default 90-day lifetime
        let issued = ShareLink::issue(Utc::now() - Duration::days(91), Duration::days(90));
        assert!(db.shares().save_share_token(id, &issued).await.unwrap());

        let (status, body) =
            send(&app, "GET", &format!("/public/invoices/{}", issued.token), None).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["code"], "LINK_EXPIRED");
        let message = body["message"].as_str().unwrap();
        assert!(!message.contains(id));
        assert!(!message.contains("INV-"));

        let invoice = db.invoices().get(id).await.unwrap();
        assert_eq!(invoice.view_count, 0);
    }

    #[tokio::test]
    async fn test_reports() {
        let (app, _) = app().await;
        seed_invoice(&app).await;

        let (status, summary) = send(
            &app,
            "GET",
            "/reports/summary?from=2026-01-01&to=2026-12-31",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["invoice_count"], 1);
        assert_eq!(decimal(&summary["total"]), Decimal::new(6210, 2));

        let monthly_uri = "/reports/monthly?from=2026-01-01&to=2026-12-31";
        let (_, monthly) = send(&app, "GET", monthly_uri, None).await;
        assert_eq!(monthly[0]["month"], "2026-03");

        let (_, outstanding) = send(&app, "GET", "/reports/outstanding", None).await;
        assert_eq!(outstanding["invoice_count"], 1);
        assert_eq!(outstanding["invoices"].as_array().unwrap().len(), 1);
        assert_eq!(decimal(&outstanding["total_outstanding"]), Decimal::new(6210, 2));
        assert_eq!(decimal(&outstanding["total_overdue"]), Decimal::new(6210, 2));

        let later_uri = "/reports/outstanding?from=2026-04-01";
        let (_, later) = send(&app, "GET", later_uri, None).await;
        assert_eq!(later["invoice_count"], 0);

        let inverted_uri = "/reports/summary?from=2026-12-31&to=2026-01-01";
        let (status, _) = send(&app, "GET", inverted_uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_outstanding_report_skips_settled_invoices() {
        let (app, _) = app().await;
        let created = seed_invoice(&app).await;
        let id = created["invoice"]["id"].as_str().unwrap();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/invoices/{id}/status"),
            Some(json!({"status": "partially_paid", "method": "Cash"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, outstanding) = send(&app, "GET", "/reports/outstanding", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outstanding["invoice_count"], 0);
        assert_eq!(decimal(&outstanding["total_outstanding"]), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_client_and_payment_history_reports() {
        let (app, _) = app().await;
        let created = seed_invoice(&app).await;
        let id = created["invoice"]["id"].as_str().unwrap();

        for (amount, date) in [("20", "2026-03-05"), ("12.10", "2026-03-09")] {
            let (status, _) = send(
                &app,
                "POST",
                &format!("/invoices/{id}/payments"),
                Some(json!({"amount": amount, "method": "Cash", "payment_date": date})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let range = "from=2026-01-01&to=2026-12-31";
        let (status, clients) = send(&app, "GET", &format!("/reports/clients?{range}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let history = &clients[0];
        assert_eq!(history["name"], "Aroha Ngata");
        assert_eq!(history["invoice_count"], 1);
        assert_eq!(decimal(&history["total_billed"]), Decimal::new(6210, 2));
        assert_eq!(decimal(&history["total_paid"]), Decimal::new(3210, 2));
        assert_eq!(decimal(&history["outstanding_balance"]), Decimal::new(3000, 2));

        let uri = format!("/reports/payment-history?{range}");
        let (status, payments) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let payments = payments.as_array().unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0]["payment_date"], "2026-03-09");
        assert_eq!(payments[0]["invoice_number"], "INV-2026-000001");
        assert_eq!(payments[1]["client_name"], "Aroha Ngata");
    }

    #[tokio::test]
    async fn test_service_catalog_crud() {
        let (app, _) = app().await;

        let (status, created) = send(
            &app,
            "POST",
            "/services",
            Some(json!({
                "name": " Skip bin hire ",
                "unit_price": "25.00",
                "category": "Waste removal"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        assert_eq!(created["name"], "Skip bin hire");
        assert_eq!(created["is_active"], true);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "POST",
            "/services",
            Some(json!({"name": "Free quote", "unit_price": "0"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/services/{id}"),
            Some(json!({"name": "Skip bin hire", "unit_price": "30", "is_active": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decimal(&updated["unit_price"]), Decimal::from(30));

        let (_, all) = send(&app, "GET", "/services", None).await;
        assert_eq!(all.as_array().unwrap().len(), 1);
        let (_, active) = send(&app, "GET", "/services?active=true", None).await;
        assert!(active.as_array().unwrap().is_empty());

        let (status, _) = send(&app, "DELETE", &format!("/services/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, "GET", &format!("/services/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        let (status, _) = send(&app, "DELETE", &format!("/services/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_out_of_range_amounts_are_rejected() {
        let (app, _) = app().await;
        let (_, client) = send(
            &app,
            "POST",
            "/clients",
            Some(json!({"name": "Hemi", "email": "hemi@example.com"})),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/invoices",
            Some(json!({
                "client_id": client["id"],
                "due_date": "2099-01-01",
                "items": [{
                    "description": "Landfill",
                    "quantity": "100000000000000",
                    "unit_price": "1000000000000000"
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = send(
            &app,
            "POST",
            "/invoices",
            Some(json!({
                "client_id": client["id"],
                "due_date": "2099-01-01",
                "tax_rate": "250",
                "items": [{"description": "Landfill", "quantity": 1, "unit_price": 10}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (_, invoices) = send(&app, "GET", "/invoices", None).await;
        assert!(invoices.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forwarded_header_ignored_without_trusted_proxy() {
        let (app, db) = app_with(false).await;
        let created = seed_invoice(&app).await;
        let id = created["invoice"]["id"].as_str().unwrap();

        let (_, share) = send(&app, "POST", &format!("/invoices/{id}/share"), None).await;
        let token = share["token"].as_str().unwrap();
        let (status, _) = send(&app, "GET", &format!("/public/invoices/{token}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let invoice = db.invoices().get(id).await.unwrap();
        assert_eq!(invoice.view_count, 1);
        assert_eq!(invoice.last_viewed_ip, None);
    }

    #[tokio::test]
    async fn test_missing_invoice_is_not_found() {
        let (app, _) = app().await;
        let (status, body) = send(&app, "GET", "/invoices/missing/statement", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
