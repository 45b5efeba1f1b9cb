//! Instrumented SQLite access.
//!
//! [`Session`] runs statements on pooled connections and reports every step
//! to its [`EventReporter`]:
//!
//! | Situation | Call |
//! | --- | --- |
//! | context done before running | `session.<op>.context` error |
//! | no connection available | `session.<op>.pool` error |
//! | statement failed or interrupted | `session.<op>.<op>` error |
//! | statement ran | `session.<op>` timing |
//! | transaction boundaries | `session.begin` / `session.commit` / `session.rollback` |
//!
//! Every statement-level event carries the SQL text under the `sql` key.
//! Errors reach the caller exactly as the reporter handed them back, so a
//! [`SessionError`] can be recovered with `downcast_ref`.
//!
//! When a session runs inside a tokio runtime, a context that finishes while
//! a statement is running interrupts that statement. Outside a runtime the
//! context is only checked before each statement.

pub mod pool;

use std::path::Path;
use std::time::Instant;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ValueRef;
use rusqlite::{Params, Row, Transaction};
use thiserror::Error;

use crate::context::{Context, ContextError};
use crate::reporter::{
    kvs, shared_null_reporter, EventReporter, EventReporterExt, Kvs, SharedReporter,
};

use self::pool::{PoolError, PoolOptions, SqlitePool, DEFAULT_BUSY_TIMEOUT};

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Open(#[from] PoolError),

    #[error("Failed to check out connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// A pool of SQLite connections plus the reporter sessions default to.
#[derive(Clone)]
pub struct Connection {
    pool: SqlitePool,
    reporter: SharedReporter,
}

impl Connection {
    /// Open a pooled connection to the database file at `db_path`.
    ///
    /// Without a reporter, sessions report to the null reporter.
    pub fn open<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        reporter: Option<SharedReporter>,
    ) -> Result<Self, SessionError> {
        Self::open_with(db_path, PoolOptions::new(pool_size), reporter)
    }

    /// Open a pooled connection with explicit pool options.
    pub fn open_with<P: AsRef<Path>>(
        db_path: P,
        options: PoolOptions,
        reporter: Option<SharedReporter>,
    ) -> Result<Self, SessionError> {
        Ok(Self::from_pool(pool::open_file_with(db_path, options)?, reporter))
    }

    /// Open a private in-memory database behind a single-connection pool.
    pub fn open_in_memory(reporter: Option<SharedReporter>) -> Result<Self, SessionError> {
        Ok(Self::from_pool(pool::open_memory()?, reporter))
    }

    fn from_pool(pool: SqlitePool, reporter: Option<SharedReporter>) -> Self {
        Self {
            pool,
            reporter: reporter.unwrap_or_else(shared_null_reporter),
        }
    }

    pub fn reporter(&self) -> &SharedReporter {
        &self.reporter
    }

    /// Current pool state for monitoring.
    pub fn state(&self) -> r2d2::State {
        self.pool.state()
    }

    /// Start a session, optionally overriding the connection's reporter.
    pub fn new_session(&self, reporter: Option<SharedReporter>) -> Session {
        Session {
            pool: self.pool.clone(),
            reporter: reporter.unwrap_or_else(|| self.reporter.clone()),
        }
    }
}

/// Runs statements and reports what happened.
#[derive(Clone)]
pub struct Session {
    pool: SqlitePool,
    reporter: SharedReporter,
}

impl Session {
    pub fn reporter(&self) -> &SharedReporter {
        &self.reporter
    }

    /// Execute a statement, returning the number of changed rows.
    #[tracing::instrument(skip_all, fields(sql = %sql))]
    pub fn exec<P: Params>(&self, ctx: &Context, sql: &str, params: P) -> anyhow::Result<usize> {
        let fields = kvs([("sql", sql)]);
        let conn = self.checkout(ctx, "exec", &fields)?;
        let _interrupt = InterruptOnDone::arm(ctx, &conn);

        let start = Instant::now();
        let result = conn.execute(sql, params);
        self.reporter.report_elapsed(ctx, "session.exec", start, &fields);

        let changed = result.map_err(|e| self.fail(ctx, "session.exec.exec", e.into(), &fields))?;
        tracing::debug!(changed, "Statement executed");
        Ok(changed)
    }

    /// Run a query and map every row with `f`.
    #[tracing::instrument(skip_all, fields(sql = %sql))]
    pub fn query_map<T, P, F>(
        &self,
        ctx: &Context,
        sql: &str,
        params: P,
        f: F,
    ) -> anyhow::Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let fields = kvs([("sql", sql)]);
        let conn = self.checkout(ctx, "query", &fields)?;
        let _interrupt = InterruptOnDone::arm(ctx, &conn);

        let start = Instant::now();
        let result = collect_rows(&conn, sql, params, f);
        self.reporter.report_elapsed(ctx, "session.query", start, &fields);

        let rows = result.map_err(|e| self.fail(ctx, "session.query.query", e.into(), &fields))?;
        tracing::debug!(rows = rows.len(), "Query returned");
        Ok(rows)
    }

    /// Run a parameterless query and render every column as text.
    ///
    /// `NULL` renders as `NULL`, blobs as their length.
    pub fn query_rows(&self, ctx: &Context, sql: &str) -> anyhow::Result<Vec<Vec<String>>> {
        self.query_map(ctx, sql, [], |row| {
            (0..row.as_ref().column_count())
                .map(|i| row.get_ref(i).map(render_value))
                .collect()
        })
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` succeeds and the context is still live, rolls back
    /// otherwise. An error from `f` is reported as `session.transaction` and
    /// returned unchanged.
    #[tracing::instrument(skip_all)]
    pub fn transaction<T, F>(&self, ctx: &Context, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> anyhow::Result<T>,
    {
        let fields = Kvs::new();
        let mut conn = self.checkout(ctx, "transaction", &fields)?;
        let _interrupt = InterruptOnDone::arm(ctx, &conn);

        let start = Instant::now();
        let tx = conn
            .transaction()
            .map_err(|e| self.fail(ctx, "session.transaction.begin", e.into(), &fields))?;
        self.reporter.report(ctx, "session.begin");

        let outcome = match f(&tx) {
            Ok(value) => match ctx.err() {
                None => tx
                    .commit()
                    .map(|()| {
                        self.reporter.report(ctx, "session.commit");
                        value
                    })
                    .map_err(|e| self.fail(ctx, "session.transaction.commit", e.into(), &fields)),
                Some(err) => {
                    self.rollback(ctx, tx);
                    Err(self.fail(ctx, "session.transaction.context", err.into(), &fields))
                }
            },
            Err(err) => {
                self.rollback(ctx, tx);
                Err(self.reporter.report_error(ctx, "session.transaction", err))
            }
        };

        self.reporter.report_elapsed(ctx, "session.transaction", start, &fields);
        outcome
    }

    fn rollback(&self, ctx: &Context, tx: Transaction<'_>) {
        match tx.rollback() {
            Ok(()) => self.reporter.report(ctx, "session.rollback"),
            Err(e) => {
                let err = self.fail(ctx, "session.transaction.rollback", e.into(), &Kvs::new());
                tracing::warn!(error = %err, "Rollback failed");
            }
        }
    }

    /// Check the context, then take a connection whose busy timeout fits the
    /// context deadline.
    fn checkout(
        &self,
        ctx: &Context,
        op: &str,
        fields: &Kvs,
    ) -> anyhow::Result<PooledConnection<SqliteConnectionManager>> {
        if let Some(err) = ctx.err() {
            return Err(self.fail(ctx, &format!("session.{op}.context"), err.into(), fields));
        }

        let conn = self
            .pool
            .get()
            .map_err(|e| self.fail(ctx, &format!("session.{op}.pool"), e.into(), fields))?;

        let busy_timeout = ctx
            .remaining()
            .map_or(DEFAULT_BUSY_TIMEOUT, |remaining| remaining.min(DEFAULT_BUSY_TIMEOUT));
        conn.busy_timeout(busy_timeout)
            .map_err(|e| self.fail(ctx, &format!("session.{op}.pool"), e.into(), fields))?;

        Ok(conn)
    }

    fn fail(
        &self,
        ctx: &Context,
        event_name: &str,
        err: SessionError,
        fields: &Kvs,
    ) -> anyhow::Error {
        self.reporter
            .report_error_with_fields(ctx, event_name, err.into(), fields)
    }
}

/// Interrupts the connection's running statement once the context is done.
///
/// Disarmed on drop. Without a tokio runtime there is nothing to wait on the
/// context with, and the guard does nothing.
struct InterruptOnDone(Option<tokio::task::JoinHandle<()>>);

impl InterruptOnDone {
    fn arm(ctx: &Context, conn: &rusqlite::Connection) -> Self {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return Self(None);
        };
        let handle = conn.get_interrupt_handle();
        let ctx = ctx.clone();
        Self(Some(runtime.spawn(async move {
            let reason = ctx.done().await;
            tracing::debug!(%reason, "Context done, interrupting statement");
            handle.interrupt();
        })))
    }
}

impl Drop for InterruptOnDone {
    fn drop(&mut self) {
        if let Some(watcher) = self.0.take() {
            watcher.abort();
        }
    }
}

fn collect_rows<T, P, F>(
    conn: &rusqlite::Connection,
    sql: &str,
    params: P,
    f: F,
) -> rusqlite::Result<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, f)?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_owned(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(blob) => format!("<{} bytes>", blob.len()),
    }
}
