//! # Connection Pool
//!
//! Opens the SQLite file, tunes it for a multi-request server and hands out
//! repositories.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new("./tally.db")                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new ──► connect options                                      │
//! │       │              journal_mode = WAL     (readers never block)       │
//! │       │              synchronous  = NORMAL                              │
//! │       │              foreign_keys = ON                                  │
//! │       │              busy_timeout = 5s      (writers queue, not fail)   │
//! │       ▼                                                                 │
//! │  SqlitePool [conn, conn, ... max_connections]                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  embedded migrations                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.clients() / services() / invoices() / payments() / shares() / ...   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite admits one writer at a time. Every write path in this crate is
//! either a single statement or a transaction that writes first, so a
//! queued writer waits on `busy_timeout` instead of failing with
//! `SQLITE_BUSY` mid-transaction.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::client::ClientRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::report::ReportRepository;
use crate::repository::service::ServiceRepository;
use crate::repository::share::ShareRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how the pool behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/tally/tally.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open.
    pub database_path: PathBuf,

    /// Pool ceiling. Default 5.
    pub max_connections: u32,

    /// Connections kept open while idle. Default 1.
    pub min_connections: u32,

    /// How long a request waits for a free connection. Default 30s.
    pub connect_timeout: Duration,

    /// How long a writer waits for the SQLite write lock. Default 5s.
    pub busy_timeout: Duration,

    /// Idle connections are closed after this. Default 10 minutes.
    pub idle_timeout: Duration,

    /// Apply embedded migrations on open. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// A private in-memory database on a single connection.
    ///
    /// Every SQLite connection to `:memory:` sees its own empty database,
    /// so the pool is pinned to one connection. Use a temp file for tests
    /// that need real concurrency.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", self.database_path.display())
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Off by default in SQLite
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true);

        Ok(options)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the invoicing database.
///
/// Clones share one pool. Repositories are built per call and carry their
/// own pool handle, so they can move into spawned tasks.
///
/// ```rust,ignore
/// async fn get_invoice(
///     State(state): State<AppState>,
///     Path(id): Path<String>,
/// ) -> Result<Json<InvoiceWithItems>, ApiError> {
///     Ok(Json(state.db.invoices().load_invoice_with_items(&id).await?))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    ///
    /// ## Errors
    /// * `DbError::ConnectionFailed` - bad path, unreadable file, pool timeout
    /// * `DbError::MigrationFailed` - an embedded migration did not apply
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let options = config.connect_options()?;
        debug!(busy_timeout_ms = config.busy_timeout.as_millis() as u64, "Connect options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool created");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending embedded migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Embedded vs applied migration counts.
    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn clients(&self) -> ClientRepository {
        ClientRepository::new(self.pool.clone())
    }

    /// ```rust,ignore
    /// let loaded = db.invoices().load_invoice_with_items(&id).await?;
    /// ```
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    pub fn shares(&self) -> ShareRepository {
        ShareRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    pub fn services(&self) -> ServiceRepository {
        ServiceRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool. Later
    /// repository calls fail.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.is_in_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_in_memory());
        assert_eq!(memory.max_connections, 1);
        assert_eq!(memory.busy_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_file_database_runs_migrations_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert!(db.health_check().await);
        db.close().await;
        assert!(!db.health_check().await);

        // Reopening applies nothing new
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert!(db.migration_status().await.unwrap().is_current());
    }
}
