//! Database service for invoice-service.
//!
//! Holds the pool wrapper and the one atomicity guarantee the pipeline
//! exists to uphold: an invoice and all of its dependent rows commit in a
//! single transaction or not at all.

use crate::extraction::InvoiceAggregate;
use crate::models::{
    Company, ConsumptionHistory, EnergyLineItem, Invoice, InvoiceRecord, ListInvoicesFilter, User,
};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, company_id, user_id, installation, client_code, \
    due_date, total_amount, public_contribution, nota_fiscal, reference_month, band, name, \
    path, distributor, created_utc, updated_utc, deleted_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoice-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Collaborator lookups (identity data owned elsewhere)
    // -------------------------------------------------------------------------

    /// Resolve a user by id.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, name, role, created_utc FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        Ok(user)
    }

    /// Resolve a company the given user may act on. Admins may act on any
    /// company; other roles must be members.
    #[instrument(skip(self, user), fields(user_id = %user.user_id, company_id = %company_id))]
    pub async fn company_for_user(
        &self,
        user: &User,
        company_id: Uuid,
    ) -> Result<Option<Company>, AppError> {
        let company = if user.is_admin() {
            sqlx::query_as::<_, Company>(
                "SELECT company_id, name, created_utc FROM companies WHERE company_id = $1",
            )
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Company>(
                r#"
                SELECT c.company_id, c.name, c.created_utc
                FROM companies c
                JOIN user_companies uc ON uc.company_id = c.company_id
                WHERE c.company_id = $1 AND uc.user_id = $2
                "#,
            )
            .bind(company_id)
            .bind(user.user_id)
            .fetch_optional(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to resolve company: {}", e)))?;

        Ok(company)
    }

    /// Company ids the user is a member of, for list scoping.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn member_company_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT company_id FROM user_companies WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list user companies: {}", e))
        })?;

        Ok(ids)
    }

    // -------------------------------------------------------------------------
    // Invoice unit of work
    // -------------------------------------------------------------------------

    /// Persist a parsed invoice aggregate atomically.
    ///
    /// One transaction: invoice row first (its generated id anchors the
    /// children), then the line items, then the history row. Any failure
    /// before commit rolls the whole write back; readers never observe a
    /// partial aggregate.
    #[instrument(
        skip(self, aggregate),
        fields(company_id = %aggregate.invoice.company_id, nota_fiscal = %aggregate.invoice.nota_fiscal)
    )]
    pub async fn create_invoice(
        &self,
        aggregate: &InvoiceAggregate,
    ) -> Result<InvoiceRecord, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice_id = Uuid::new_v4();
        let new = &aggregate.invoice;
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, company_id, user_id, installation, client_code, due_date,
                total_amount, public_contribution, nota_fiscal, reference_month, band,
                name, path
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(new.company_id)
        .bind(new.user_id)
        .bind(&new.installation)
        .bind(&new.client_code)
        .bind(&new.due_date)
        .bind(new.total_amount)
        .bind(new.public_contribution)
        .bind(&new.nota_fiscal)
        .bind(&new.reference_month)
        .bind(&new.band)
        .bind(&new.name)
        .bind(&new.path)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert invoice: {}", e)))?;

        let mut line_items = Vec::with_capacity(aggregate.line_items.len());
        for item in &aggregate.line_items {
            let row = sqlx::query_as::<_, EnergyLineItem>(
                r#"
                INSERT INTO energy_line_items (line_item_id, invoice_id, category, quantity, value, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING line_item_id, invoice_id, category, quantity, value, unit_price, created_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice_id)
            .bind(item.category.as_str())
            .bind(item.quantity)
            .bind(item.value)
            .bind(item.unit_price)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert line item: {}", e))
            })?;
            line_items.push(row);
        }

        let history = sqlx::query_as::<_, ConsumptionHistory>(
            r#"
            INSERT INTO consumption_history (history_id, invoice_id, entries)
            VALUES ($1, $2, $3)
            RETURNING history_id, invoice_id, entries, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(Json(&aggregate.history))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert history: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, "Invoice aggregate persisted");

        Ok(InvoiceRecord {
            invoice,
            line_items,
            history: history.entries.0,
        })
    }

    // -------------------------------------------------------------------------
    // Invoice reads and soft delete
    // -------------------------------------------------------------------------

    /// Read an invoice with its line items and history. Soft-deleted
    /// invoices are not visible.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<InvoiceRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 AND deleted_utc IS NULL"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        let Some(invoice) = invoice else {
            timer.observe_duration();
            return Ok(None);
        };

        let line_items = sqlx::query_as::<_, EnergyLineItem>(
            r#"
            SELECT line_item_id, invoice_id, category, quantity, value, unit_price, created_utc
            FROM energy_line_items
            WHERE invoice_id = $1
            ORDER BY created_utc, category
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        let history: Option<ConsumptionHistory> = sqlx::query_as(
            r#"
            SELECT history_id, invoice_id, entries, created_utc
            FROM consumption_history
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get history: {}", e)))?;

        timer.observe_duration();

        Ok(Some(InvoiceRecord {
            invoice,
            line_items,
            history: history.map(|h| h.entries.0).unwrap_or_default(),
        }))
    }

    /// List invoices matching the filter, newest first, with the total count
    /// for pagination.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<(Vec<Invoice>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = filter.limit.clamp(1, 100);
        let offset = (filter.page.max(1) - 1) * limit;

        const WHERE_CLAUSE: &str = r#"
            WHERE deleted_utc IS NULL
              AND ($1::uuid[] IS NULL OR company_id = ANY($1))
              AND ($2::uuid[] IS NULL OR user_id = ANY($2))
              AND ($3::date IS NULL OR created_utc >= $3)
              AND ($4::date IS NULL OR created_utc < $4 + INTERVAL '1 day')
              AND ($5::numeric IS NULL OR total_amount >= $5)
              AND ($6::numeric IS NULL OR total_amount <= $6)
        "#;

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices {WHERE_CLAUSE} \
             ORDER BY created_utc DESC LIMIT $7 OFFSET $8"
        ))
        .bind(&filter.company_ids)
        .bind(&filter.user_ids)
        .bind(filter.initial_date)
        .bind(filter.final_date)
        .bind(filter.min_amount)
        .bind(filter.max_amount)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM invoices {WHERE_CLAUSE}"
        ))
        .bind(&filter.company_ids)
        .bind(&filter.user_ids)
        .bind(filter.initial_date)
        .bind(filter.final_date)
        .bind(filter.min_amount)
        .bind(filter.max_amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e)))?;

        timer.observe_duration();

        Ok((invoices, total))
    }

    /// Soft-delete an invoice. Line items and history stay in place; they
    /// are only reachable through the invoice, which reads now skip.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn soft_delete_invoice(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["soft_delete_invoice"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE invoices SET deleted_utc = NOW(), updated_utc = NOW() \
             WHERE invoice_id = $1 AND deleted_utc IS NULL",
        )
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e)))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, "Invoice soft-deleted");
        }

        Ok(deleted)
    }
}
