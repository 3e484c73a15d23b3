//! Connection pool for the key database.
//!
//! The controller shares the database file with whatever manages members
//! and keys, so connections wait on that writer's locks (`busy_timeout`)
//! instead of failing a lookup immediately. A deployment where the schema is
//! owned elsewhere can open the file read-only.

use crate::error::{StorageError, StorageResult};
use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database file.
    pub path: PathBuf,

    /// Pool size. Lookups are short; the access loop needs one at a time.
    pub max_connections: u32,

    /// How long a lookup waits for a pooled connection.
    pub acquire_timeout: Duration,

    /// How long a statement waits on a lock held by another writer.
    pub busy_timeout: Duration,

    pub create_if_missing: bool,

    /// Open without write access. Incompatible with `auto_migrate`.
    pub read_only: bool,

    /// Apply the embedded migrations when opening.
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("latchkey.db"),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
            read_only: false,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Open read-only. Also turns off `auto_migrate` and `create_if_missing`.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        if read_only {
            self.auto_migrate = false;
            self.create_if_missing = false;
        }
        self
    }

    pub fn auto_migrate(mut self, migrate: bool) -> Self {
        self.auto_migrate = migrate;
        self
    }

    fn connect_options(&self) -> StorageResult<SqliteConnectOptions> {
        if self.read_only && self.auto_migrate {
            return Err(StorageError::Configuration(
                "a read-only key database cannot be migrated".to_string(),
            ));
        }

        let mut options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(self.create_if_missing)
            .read_only(self.read_only)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .disable_statement_logging();
        if !self.read_only {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }
        Ok(options)
    }
}

/// Pooled handle to the key database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the key database, creating its directory and schema as
    /// configured.
    ///
    /// ```no_run
    /// use latchkey_storage::connection::{Database, DatabaseConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new(DatabaseConfig::new("/var/lib/latchkey/keys.db")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: DatabaseConfig) -> StorageResult<Self> {
        let options = config.connect_options()?;

        if config.create_if_missing
            && let Some(dir) = config.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|e| {
                StorageError::Configuration(format!(
                    "cannot create key database directory {}: {e}",
                    dir.display()
                ))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;
        let db = Self { pool };

        if config.auto_migrate {
            db.migrate().await?;
        }

        info!(
            path = %config.path.display(),
            read_only = config.read_only,
            "Opened key database"
        );
        Ok(db)
    }

    /// Private in-memory database with the schema applied, for tests.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        // A second connection would open a second, empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply the migrations embedded from `migrations/`.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        debug!("Key database schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Round-trip a trivial statement.
    pub async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
