//! Persistence unit-of-work integration tests against a live PostgreSQL.
//!
//! Each test skips (with a note on stderr) when DATABASE_URL is not set, so
//! the suite stays green on machines without a database.

use invoice_service::extraction::InvoiceAggregate;
use invoice_service::models::{ConsumptionEntry, EnergyCategory, NewEnergyLineItem, NewInvoice};
use invoice_service::services::Database;
use rust_decimal::Decimal;
use uuid::Uuid;

async fn test_db() -> Option<Database> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping persistence test");
        return None;
    };
    let db = Database::new(&url, 5, 1).await.expect("Failed to connect");
    db.run_migrations().await.expect("Failed to migrate");
    Some(db)
}

async fn seed_identity(db: &Database, user_id: Uuid, company_id: Uuid) {
    sqlx::query("INSERT INTO users (user_id, name, role) VALUES ($1, 'Test User', 'customer')")
        .bind(user_id)
        .execute(db.pool())
        .await
        .expect("Failed to seed user");
    sqlx::query("INSERT INTO companies (company_id, name) VALUES ($1, 'Test Company')")
        .bind(company_id)
        .execute(db.pool())
        .await
        .expect("Failed to seed company");
    sqlx::query("INSERT INTO user_companies (user_id, company_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(company_id)
        .execute(db.pool())
        .await
        .expect("Failed to seed membership");
}

fn test_aggregate(company_id: Uuid, user_id: Uuid, nota_fiscal: &str) -> InvoiceAggregate {
    InvoiceAggregate {
        invoice: NewInvoice {
            company_id,
            user_id,
            installation: "7204076116".to_string(),
            client_code: "3001116735".to_string(),
            due_date: "12/02/2024".to_string(),
            total_amount: Decimal::new(5875, 2),
            public_contribution: Decimal::new(350, 2),
            nota_fiscal: nota_fiscal.to_string(),
            reference_month: "JAN/24".to_string(),
            band: "Verde".to_string(),
            name: "fatura_jan_2024.pdf".to_string(),
            path: "test/fatura_jan_2024.pdf".to_string(),
        },
        line_items: vec![
            NewEnergyLineItem {
                category: EnergyCategory::EnergyElectric,
                quantity: Decimal::new(1000, 1),
                value: Decimal::new(5025, 2),
                unit_price: Decimal::new(50_250_000, 8),
            },
            NewEnergyLineItem {
                category: EnergyCategory::EnergyScee,
                quantity: Decimal::new(20, 0),
                value: Decimal::new(1000, 2),
                unit_price: Decimal::new(48_000_000, 8),
            },
            NewEnergyLineItem {
                category: EnergyCategory::CompensatedEnergy,
                quantity: Decimal::new(10, 0),
                value: Decimal::new(-500, 2),
                unit_price: Decimal::new(50_000_000, 8),
            },
        ],
        history: vec![
            ConsumptionEntry {
                month: "JAN".to_string(),
                year: "24".to_string(),
                consumption: "506".to_string(),
            },
            ConsumptionEntry {
                month: "DEZ".to_string(),
                year: "23".to_string(),
                consumption: "606".to_string(),
            },
        ],
    }
}

#[tokio::test]
async fn persisted_aggregate_reads_back_complete() {
    let Some(db) = test_db().await else { return };

    let user_id = Uuid::new_v4();
    let company_id = Uuid::new_v4();
    seed_identity(&db, user_id, company_id).await;

    let aggregate = test_aggregate(company_id, user_id, &unique_nota());
    let record = db
        .create_invoice(&aggregate)
        .await
        .expect("Failed to persist aggregate");

    assert_eq!(record.line_items.len(), 3);
    assert_eq!(record.history.len(), 2);

    let read_back = db
        .get_invoice(record.invoice.invoice_id)
        .await
        .expect("Failed to read invoice")
        .expect("Invoice missing after commit");

    assert_eq!(read_back.invoice.total_amount, Decimal::new(5875, 2));
    assert_eq!(read_back.invoice.reference_month, "JAN/24");
    assert_eq!(read_back.invoice.distributor, "CEMIG");
    assert_eq!(read_back.line_items.len(), 3);

    // Document order survives the jsonb round trip
    assert_eq!(read_back.history[0].month, "JAN");
    assert_eq!(read_back.history[1].month, "DEZ");
}

#[tokio::test]
async fn failed_child_insert_leaves_no_partial_aggregate() {
    let Some(db) = test_db().await else { return };

    let user_id = Uuid::new_v4();
    let company_id = Uuid::new_v4();
    seed_identity(&db, user_id, company_id).await;

    let nota_fiscal = unique_nota();
    let mut aggregate = test_aggregate(company_id, user_id, &nota_fiscal);
    // numeric(10,4) caps at 999999.9999, so the second insert of the
    // sequence blows up after the invoice row already went in
    aggregate.line_items[0].quantity = Decimal::new(10_000_000, 0);

    let result = db.create_invoice(&aggregate).await;
    assert!(result.is_err(), "Oversized line item was accepted");

    let orphans = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM invoices WHERE nota_fiscal = $1",
    )
    .bind(&nota_fiscal)
    .fetch_one(db.pool())
    .await
    .expect("Failed to count invoices");

    assert_eq!(orphans, 0, "Rolled-back invoice row is still visible");
}

#[tokio::test]
async fn soft_deleted_invoice_is_not_readable() {
    let Some(db) = test_db().await else { return };

    let user_id = Uuid::new_v4();
    let company_id = Uuid::new_v4();
    seed_identity(&db, user_id, company_id).await;

    let aggregate = test_aggregate(company_id, user_id, &unique_nota());
    let record = db.create_invoice(&aggregate).await.expect("persist");

    let deleted = db
        .soft_delete_invoice(record.invoice.invoice_id)
        .await
        .expect("Failed to soft-delete");
    assert!(deleted);

    let gone = db
        .get_invoice(record.invoice.invoice_id)
        .await
        .expect("Failed to read invoice");
    assert!(gone.is_none());

    // Rows are retained, only hidden
    let retained = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM invoices WHERE invoice_id = $1 AND deleted_utc IS NOT NULL",
    )
    .bind(record.invoice.invoice_id)
    .fetch_one(db.pool())
    .await
    .expect("Failed to count");
    assert_eq!(retained, 1);
}

fn unique_nota() -> String {
    Uuid::new_v4().simple().to_string()
}
