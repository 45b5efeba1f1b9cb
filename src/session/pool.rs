//! Pooled SQLite connections.
//!
//! Uses r2d2 with r2d2_sqlite. Every new connection gets foreign keys
//! enabled and the default busy timeout before it enters the pool.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Pool of SQLite connections.
pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Busy timeout applied when the caller's context has no deadline.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a checkout waits for a free connection by default.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for pool construction.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Pool size must be at least 1")]
    InvalidSize,

    #[error("Connection timeout must be positive")]
    InvalidTimeout,

    #[error("Failed to build connection pool: {0}")]
    Build(#[from] r2d2::Error),
}

/// Sizing and checkout settings for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// How long a checkout waits before failing
    pub connection_timeout: Duration,
}

impl PoolOptions {
    #[must_use]
    pub fn new(max_size: u32) -> Self {
        Self {
            max_size,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<(), PoolError> {
        if self.max_size == 0 {
            return Err(PoolError::InvalidSize);
        }
        if self.connection_timeout.is_zero() {
            return Err(PoolError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Open a pool over the database file at `db_path`, creating it if needed.
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file
/// * `max_size` - Maximum number of connections in the pool, at least 1
pub fn open_file<P: AsRef<Path>>(db_path: P, max_size: u32) -> Result<SqlitePool, PoolError> {
    open_file_with(db_path, PoolOptions::new(max_size))
}

/// Open a pool over the database file at `db_path` with explicit options.
pub fn open_file_with<P: AsRef<Path>>(
    db_path: P,
    options: PoolOptions,
) -> Result<SqlitePool, PoolError> {
    build(SqliteConnectionManager::file(db_path), options)
}

/// Open a single-connection pool over a private in-memory database.
///
/// Every in-memory connection is its own database, so the pool is capped at
/// one connection.
pub fn open_memory() -> Result<SqlitePool, PoolError> {
    build(SqliteConnectionManager::memory(), PoolOptions::new(1))
}

fn build(manager: SqliteConnectionManager, options: PoolOptions) -> Result<SqlitePool, PoolError> {
    // r2d2 panics on a zero size or timeout
    options.validate()?;
    Ok(Pool::builder()
        .max_size(options.max_size)
        .connection_timeout(options.connection_timeout)
        .connection_customizer(Box::new(ConnectionCustomizer))
        .build(manager)?)
}

/// Applies per-connection settings when a connection is created.
#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)
    }
}
