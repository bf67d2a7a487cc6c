//! # Seed Data Generator
//!
//! Populates the database with sample clients, invoices and payments for
//! development.
//!
//! ## Usage
//! ```bash
//! # Generate 60 invoices (default)
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! - One client per entry in `CLIENTS`, one catalog service per `SERVICES`
//! - Invoices spread over the last twelve months, 1-4 line items each
//! - Every third invoice marked paid (booking a full payment), every
//!   fifth partially paid, every seventh overdue
//! - Every other invoice shared, with a few public views recorded

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::env;
use tally_core::draft::{InvoiceDraft, LineItemInput};
use tally_core::reconcile::{PaymentDraft, StatusChange};
use tally_core::share::DEFAULT_SHARE_LINK_DAYS;
use tally_core::{DiscountPolicy, Money, NewClient, NewService, TaxRate, DEFAULT_TAX_RATE_PERCENT};
use tally_db::{Database, DbConfig};

/// (name, company, email)
const CLIENTS: &[(&str, &str, &str)] = &[
    ("Aroha Ngata", "Ngata Builders", "aroha@ngatabuilders.example"),
    ("Liam Walker", "Walker Landscaping", "liam@walkerland.example"),
    ("Mere Tane", "", "mere.tane@example.com"),
    ("Sophie Chen", "Harbour Cafe", "accounts@harbourcafe.example"),
    ("Jack Wilson", "Wilson Rentals", "jack@wilsonrentals.example"),
    ("Priya Patel", "", "priya.patel@example.com"),
];

/// (description, unit price in cents, category)
const SERVICES: &[(&str, i64, &str)] = &[
    ("General rubbish removal (trailer load)", 12000, "Removal"),
    ("Green waste removal", 8500, "Removal"),
    ("Skip bin hire - 3m3", 24500, "Skip bins"),
    ("Skip bin hire - 6m3", 39000, "Skip bins"),
    ("Whiteware disposal", 4000, "Disposal"),
    ("Mattress disposal", 3500, "Disposal"),
    ("Garage clean-out (per hour)", 6500, "Labour"),
    ("Construction waste removal", 18000, "Removal"),
];

const METHODS: &[&str] = &["Bank Transfer", "Cash", "Credit Card"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of invoices to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Invoices: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.clients().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} clients", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut clients = Vec::with_capacity(CLIENTS.len());
    for (name, company, email) in CLIENTS {
        let client = db
            .clients()
            .insert(&NewClient {
                name: name.to_string(),
                company: Some(company.to_string()),
                address: None,
                email: email.to_string(),
                phone: None,
            })
            .await?;
        clients.push(client);
    }
    println!("✓ Created {} clients", clients.len());

    for (name, cents, category) in SERVICES {
        db.services()
            .insert(&NewService {
                name: name.to_string(),
                description: None,
                unit_price: Money::new(Decimal::new(*cents, 2)),
                category: Some(category.to_string()),
                is_active: true,
            })
            .await?;
    }
    println!("✓ Created {} catalog services", SERVICES.len());

    println!();
    println!("Generating invoices...");

    let start = std::time::Instant::now();
    let today = Utc::now().date_naive();
    let tax_rate = TaxRate::from_percentage(Decimal::from(DEFAULT_TAX_RATE_PERCENT));
    let mut generated = 0;
    let mut payments = 0;

    for seed in 0..count {
        let client = &clients[seed % clients.len()];
        let invoice_date = today - Duration::days(((seed * 37) % 365) as i64);

        let draft = InvoiceDraft {
            client_id: client.id.clone(),
            invoice_date,
            due_date: invoice_date + Duration::days(14),
            notes: (seed % 4 == 0).then(|| "Thank you for choosing us.".to_string()),
            tax_rate,
            discount: discount_for(seed),
            items: items_for(seed),
        };

        let prepared = match draft.prepare() {
            Ok(prepared) => prepared,
            Err(e) => {
                eprintln!("Skipping invoice {}: {}", seed, e);
                continue;
            }
        };

        let created = db.invoices().create(&prepared).await?;
        let id = created.invoice.id.clone();
        let method = METHODS[seed % METHODS.len()];

        if seed % 3 == 0 {
            let change = StatusChange::parse("paid", method, invoice_date + Duration::days(7))?;
            db.invoices().update_status(&id, &change).await?;
            payments += 1;
        } else if seed % 5 == 0 {
            db.invoices()
                .set_invoice_status(&id, tally_core::InvoiceStatus::PartiallyPaid)
                .await?;
            db.payments()
                .append_payment(&PaymentDraft {
                    invoice_id: id.clone(),
                    amount: Money::new(created.invoice.total.amount() / Decimal::from(2)).rounded(),
                    method: method.to_string(),
                    payment_date: invoice_date + Duration::days(10),
                    transaction_id: Some(format!("TX{:06}", seed)),
                    notes: Some("First instalment".to_string()),
                })
                .await?;
            payments += 1;
        } else if seed % 7 == 0 {
            db.invoices()
                .set_invoice_status(&id, tally_core::InvoiceStatus::Overdue)
                .await?;
        }

        if seed % 2 == 0 {
            let now = Utc::now();
            db.shares()
                .ensure_share_token(&id, Duration::days(DEFAULT_SHARE_LINK_DAYS), now)
                .await?;
            for view in 0..(seed % 4) {
                let viewed_at = now + Duration::minutes(view as i64);
                db.shares()
                    .increment_view_count(&id, Some("203.0.113.10"), viewed_at)
                    .await?;
            }
        }

        generated += 1;
        if generated % 20 == 0 {
            println!("  Generated {} invoices...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} invoices and {} payments in {:?}", generated, payments, elapsed);

    let outstanding = db.reports().outstanding(None, None, today).await?;
    println!(
        "  Outstanding invoices: {} ({} overdue of {} owed)",
        outstanding.invoice_count, outstanding.total_overdue, outstanding.total_outstanding
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// 1-4 line items cycling through the service catalogue.
fn items_for(seed: usize) -> Vec<LineItemInput> {
    (0..=(seed % 4))
        .map(|n| {
            let (description, cents, _) = SERVICES[(seed + n * 3) % SERVICES.len()];
            let quantity = 1 + (seed + n) % 3;
            LineItemInput {
                description: description.to_string(),
                quantity: Decimal::from(quantity),
                unit_price: Decimal::new(cents, 2),
                work_details: (n == 0 && seed % 3 == 1).then(|| "Access via rear lane".to_string()),
            }
        })
        .collect()
}

fn discount_for(seed: usize) -> DiscountPolicy {
    match seed % 6 {
        0 => DiscountPolicy::Percentage(Decimal::from(10)),
        3 => DiscountPolicy::Fixed(Decimal::from(20)),
        _ => DiscountPolicy::None,
    }
}
