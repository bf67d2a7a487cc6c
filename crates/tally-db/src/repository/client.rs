//! # Client Repository
//!
//! Database operations for clients. Emails are unique, stored lowercase.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{Client, NewClient};

const CLIENT_COLUMNS: &str = "id, name, company, address, email, phone, created_at";

#[derive(Debug, FromRow)]
struct ClientRow {
    id: String,
    name: String,
    company: Option<String>,
    address: Option<String>,
    email: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            name: row.name,
            company: row.company,
            address: row.address,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Inserts a new client.
    ///
    /// ## Returns
    /// * `Ok(Client)` - Inserted client
    /// * `Err(DbError::UniqueViolation)` - Email already on file
    pub async fn insert(&self, new: &NewClient) -> DbResult<Client> {
        let new = new.normalized();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            company: new.company,
            address: new.address,
            email: new.email,
            phone: new.phone,
            created_at: Utc::now(),
        };

        debug!(email = %client.email, "Inserting client");

        let result = sqlx::query(
            r#"
            INSERT INTO clients (id, name, company, address, email, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.company)
        .bind(&client.address)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(client_id = %client.id, "Client created");
                Ok(client)
            }
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                Err(DbError::duplicate("email", &client.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Gets a client by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Client::from))
    }

    /// Finds a client by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE email = ?1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Client::from))
    }

    /// Lists clients ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name COLLATE NOCASE, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed clients");
        Ok(rows.into_iter().map(Client::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::repository::test_support::{client, database};
    use tally_core::NewClient;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = database().await;
        let created = client(&db, "Aroha@Example.com").await;

        assert_eq!(created.email, "aroha@example.com");

        let fetched = db.clients().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Aroha Ngata");
        assert_eq!(fetched.company.as_deref(), Some("Ngata Builders"));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = database().await;
        client(&db, "billing@example.com").await;

        let err = db
            .clients()
            .insert(&NewClient {
                name: "Someone Else".to_string(),
                company: None,
                address: None,
                email: "BILLING@example.com".to_string(),
                phone: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_find_by_email_and_list() {
        let db = database().await;
        client(&db, "b@example.com").await;
        client(&db, "a@example.com").await;

        let found = db.clients().find_by_email(" A@EXAMPLE.COM ").await.unwrap();
        assert!(found.is_some());
        assert!(db.clients().find_by_email("nobody@example.com").await.unwrap().is_none());

        assert_eq!(db.clients().list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_client() {
        let db = database().await;
        assert!(db.clients().get_by_id("missing").await.unwrap().is_none());
    }
}
