//! # Service Repository
//!
//! The catalog of billable services. Listing orders by category then name,
//! uncategorised services first.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{decimal_text, money_column};
use crate::error::{DbError, DbResult};
use tally_core::{NewService, Service};

const SERVICE_COLUMNS: &str =
    "id, name, description, unit_price, category, is_active, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: String,
    name: String,
    description: Option<String>,
    unit_price: String,
    category: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ServiceRow> for Service {
    type Error = DbError;

    fn try_from(row: ServiceRow) -> DbResult<Self> {
        Ok(Service {
            unit_price: money_column("services.unit_price", &row.unit_price)?,
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for the service catalog.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Adds a service to the catalog.
    pub async fn insert(&self, new: &NewService) -> DbResult<Service> {
        let new = new.normalized();
        let now = Utc::now();
        let service = Service {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            description: new.description,
            unit_price: new.unit_price,
            category: new.category,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO services (
                id, name, description, unit_price, category, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&service.id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(decimal_text(service.unit_price.amount()))
        .bind(&service.category)
        .bind(service.is_active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;

        info!(service_id = %service.id, name = %service.name, "Service created");
        Ok(service)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Service>> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Service::try_from).transpose()
    }

    /// Lists the catalog. With `active_only`, hidden services are skipped.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Service>> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE (?1 = 0 OR is_active = 1) \
             ORDER BY category COLLATE NOCASE, name COLLATE NOCASE"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        debug!(active_only, count = rows.len(), "Listed services");
        rows.into_iter().map(Service::try_from).collect()
    }

    /// Replaces every editable field of a service.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No service with this ID
    pub async fn update(&self, id: &str, changes: &NewService) -> DbResult<Service> {
        let changes = changes.normalized();

        let result = sqlx::query(
            r#"
            UPDATE services
            SET name = ?1, description = ?2, unit_price = ?3, category = ?4,
                is_active = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(decimal_text(changes.unit_price.amount()))
        .bind(&changes.category)
        .bind(changes.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        info!(service_id = %id, "Service updated");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id))
    }

    /// Removes a service from the catalog.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No service with this ID
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        info!(service_id = %id, "Service deleted");
        Ok(())
    }
}
