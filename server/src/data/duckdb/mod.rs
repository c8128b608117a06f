//! DuckDB warehouse service
//!
//! Owns the single connection to the declarations warehouse. Searches run
//! read-only statements through [`QueryEngine`](crate::data::traits::QueryEngine);
//! the `import` command loads exports into the declarations table.

mod engine;
pub mod error;
pub mod import;
mod params;
pub mod schema;
pub mod sql_types;

pub use error::DuckdbError;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use duckdb::{Connection, InterruptHandle};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::domain::filters::TableName;

/// Whether statements may touch the filesystem or network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    /// Serving mode: external access is switched off after bootstrap
    Disabled,
    /// Import mode: readers such as `read_csv_auto` stay available
    Enabled,
}

/// How long a timed-out statement gets to unwind after an interrupt
const INTERRUPT_GRACE: Duration = Duration::from_secs(5);

/// Progress of one `run_query` call, shared with its blocking task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryState {
    Waiting,
    Running,
    Finished,
    Abandoned,
}

/// DuckDB warehouse service
///
/// Uses a single shared connection protected by a mutex.
pub struct DuckdbService {
    conn: Mutex<Option<Connection>>,
    interrupt: Arc<InterruptHandle>,
    table: TableName,
    query_timeout: Duration,
}

impl Drop for DuckdbService {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.get_mut().take() {
            // Best-effort close - log but don't panic on error
            if let Err((_, e)) = conn.close() {
                tracing::warn!("DuckDB connection close failed during drop: {}", e);
            }
        }
    }
}

impl DuckdbService {
    /// Open (or create) the warehouse and make sure the declarations table exists.
    ///
    /// `None` opens an in-memory database.
    pub async fn init(
        path: Option<&Path>,
        table: TableName,
        query_timeout_secs: u64,
        access: FileAccess,
    ) -> Result<Self, DuckdbError> {
        let db_path: Option<PathBuf> = path.map(Path::to_path_buf);
        let bootstrap_table = table.clone();

        let conn = tokio::task::spawn_blocking(move || {
            let conn = match &db_path {
                Some(p) => Connection::open(p)?,
                None => Connection::open_in_memory()?,
            };
            conn.execute_batch(
                "SET autoinstall_known_extensions = false;
                 SET autoload_known_extensions = false;
                 PRAGMA enable_checkpoint_on_shutdown;",
            )?;
            schema::ensure_schema(&conn, &bootstrap_table)?;
            if access == FileAccess::Disabled {
                conn.execute_batch("SET enable_external_access = false;")?;
            }
            Ok::<_, DuckdbError>(conn)
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))??;

        tracing::debug!(
            path = ?path.map(|p| p.display().to_string()),
            table = %table,
            ?access,
            "DuckdbService initialized"
        );
        Ok(Self {
            interrupt: conn.interrupt_handle(),
            conn: Mutex::new(Some(conn)),
            table,
            query_timeout: Duration::from_secs(query_timeout_secs),
        })
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Get exclusive access to the connection, or `Closed` after `close()`
    pub fn conn(&self) -> Result<MappedMutexGuard<'_, Connection>, DuckdbError> {
        MutexGuard::try_map(self.conn.lock(), |opt| opt.as_mut()).map_err(|_| DuckdbError::Closed)
    }

    /// Check if the connection is still open (test utility only)
    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }

    /// Run a blocking DuckDB statement with timeout
    ///
    /// On timeout the statement is interrupted and given a short grace period
    /// to release the connection. A call still waiting for the connection
    /// when its time runs out is skipped instead.
    pub async fn run_query<T, F>(self: &Arc<Self>, f: F) -> Result<T, DuckdbError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DuckdbError> + Send + 'static,
    {
        let timeout_secs = self.query_timeout.as_secs();
        let state = Arc::new(Mutex::new(QueryState::Waiting));

        let db = Arc::clone(self);
        let task_state = Arc::clone(&state);
        let mut task = tokio::task::spawn_blocking(move || {
            let conn = db.conn()?;
            {
                let mut state = task_state.lock();
                if *state == QueryState::Abandoned {
                    return Err(DuckdbError::Timeout { timeout_secs });
                }
                *state = QueryState::Running;
            }
            let result = f(&conn);
            *task_state.lock() = QueryState::Finished;
            result
        });

        let joined = match tokio::time::timeout(self.query_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!("DuckDB query timed out after {}s", timeout_secs);
                {
                    let mut state = state.lock();
                    match *state {
                        QueryState::Running => self.interrupt.interrupt(),
                        QueryState::Waiting => *state = QueryState::Abandoned,
                        QueryState::Finished | QueryState::Abandoned => {}
                    }
                }
                if tokio::time::timeout(INTERRUPT_GRACE, task).await.is_err() {
                    tracing::error!("DuckDB statement still running after interrupt");
                }
                return Err(DuckdbError::Timeout { timeout_secs });
            }
        };

        joined.map_err(|e| {
            tracing::error!(error = %e, "DuckDB query task failed");
            DuckdbError::Io(std::io::Error::other(format!(
                "Query execution failed: {}",
                e
            )))
        })?
    }

    /// Number of rows in the declarations table
    pub async fn row_count(self: &Arc<Self>) -> Result<u64, DuckdbError> {
        let table = self.table.clone();
        self.run_query(move |conn| schema::row_count(conn, &table))
            .await
    }

    /// Load a CSV/TSV/Parquet export into the declarations table
    pub async fn import(self: &Arc<Self>, path: &Path, replace: bool) -> Result<u64, DuckdbError> {
        let db = Arc::clone(self);
        let path = path.to_path_buf();
        // Imports are not bound by the interactive query timeout
        tokio::task::spawn_blocking(move || {
            let conn = db.conn()?;
            import::import_file(&conn, &db.table, &path, replace)
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))?
    }

    /// Run a checkpoint to flush WAL to the main database file.
    ///
    /// Returns `Ok(())` if the connection is already closed (no-op).
    pub async fn checkpoint(self: &Arc<Self>) -> Result<(), DuckdbError> {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let conn_guard = db.conn.lock();
            if let Some(ref conn) = *conn_guard {
                conn.execute("CHECKPOINT", [])?;
                tracing::debug!("DuckDB checkpoint completed");
            }
            Ok(())
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))?
    }

    /// Close the DuckDB connection gracefully with explicit error handling
    pub async fn close(self: Arc<Self>) -> Result<(), DuckdbError> {
        tokio::task::spawn_blocking(move || {
            let mut conn_guard = self.conn.lock();
            if let Some(conn) = conn_guard.take() {
                // Best-effort checkpoint before close - log but don't fail on error
                if let Err(e) = conn.execute("CHECKPOINT", []) {
                    tracing::warn!("CHECKPOINT failed during close: {}", e);
                }
                conn.close().map_err(|(_, e)| DuckdbError::Database(e))?;
                tracing::debug!("DuckDB connection closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| DuckdbError::Io(std::io::Error::other(e)))?
    }
}

/// Execute a function within a transaction, automatically rolling back on error.
pub(crate) fn in_transaction<F, T>(conn: &Connection, f: F) -> Result<T, DuckdbError>
where
    F: FnOnce(&Connection) -> Result<T, DuckdbError>,
{
    conn.execute_batch("BEGIN TRANSACTION")?;
    match f(conn) {
        Ok(val) => {
            conn.execute_batch("COMMIT")?;
            Ok(val)
        }
        Err(e) => {
            // Best-effort rollback - log but return original error
            if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                tracing::warn!("ROLLBACK failed after transaction error: {}", rollback_err);
            }
            Err(e)
        }
    }
}
