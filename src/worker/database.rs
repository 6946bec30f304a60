use super::sleep_or_cancelled;
use crate::error::Result;
use crate::eventlog::EventLog;
use rusqlite::types::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_rusqlite::Connection;
use tokio_util::sync::CancellationToken;

/// A database connection that heals itself.
///
/// The handle lives behind one async mutex. Health checks, reconnects and ad
/// hoc queries all take that lock, so a query can never run against a handle
/// that a reconnect is in the middle of replacing.
pub struct DatabaseSession {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
    reconnects: AtomicU64,
}

impl DatabaseSession {
    /// Create a session without connecting yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: Mutex::new(None),
            reconnects: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// (Re)open the connection, replacing any existing handle.
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        *guard = Some(Connection::open(&self.path).await?);
        tracing::debug!("Connected to database {}", self.path.display());
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Number of reconnects performed after a failed health check.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Run `query` as a liveness check and return its first column.
    ///
    /// On failure the handle is dropped and one reconnect is attempted before
    /// returning the original error, all under the same lock.
    pub async fn check(&self, query: &str) -> Result<String> {
        let mut guard = self.conn.lock().await;
        let result = match Self::ensure(&self.path, &mut guard).await {
            Ok(conn) => scalar(conn, query).await,
            Err(e) => Err(e),
        };

        if result.is_err() {
            *guard = None;
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            match Connection::open(&self.path).await {
                Ok(conn) => {
                    tracing::info!("Reconnected to database {}", self.path.display());
                    *guard = Some(conn);
                }
                Err(e) => {
                    tracing::warn!("Reconnect to {} failed: {}", self.path.display(), e);
                }
            }
        }
        result
    }

    /// Run an ad hoc query and return the first column of the first row.
    /// Connects lazily if the handle was lost.
    pub async fn query_scalar(&self, sql: &str) -> Result<String> {
        let mut guard = self.conn.lock().await;
        let conn = Self::ensure(&self.path, &mut guard).await?;
        scalar(conn, sql).await
    }

    /// Run an ad hoc statement, returning the number of rows changed.
    /// Connects lazily if the handle was lost.
    pub async fn execute(&self, sql: &str) -> Result<usize> {
        let mut guard = self.conn.lock().await;
        let conn = Self::ensure(&self.path, &mut guard).await?;
        let sql = sql.to_string();
        let changed = conn
            .call(move |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<usize> {
                Ok(conn.execute(&sql, [])?)
            })
            .await?;
        Ok(changed)
    }

    async fn ensure<'a>(path: &Path, slot: &'a mut Option<Connection>) -> Result<&'a Connection> {
        let conn = match slot.take() {
            Some(conn) => conn,
            None => Connection::open(path).await?,
        };
        Ok(slot.insert(conn))
    }
}

impl std::fmt::Debug for DatabaseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSession")
            .field("path", &self.path)
            .field("reconnects", &self.reconnect_count())
            .finish()
    }
}

async fn scalar(conn: &Connection, sql: &str) -> Result<String> {
    let sql = sql.to_string();
    let value = conn
        .call(move |conn: &mut rusqlite::Connection| -> tokio_rusqlite::Result<Value> {
            Ok(conn.query_row(&sql, [], |row| row.get::<_, Value>(0))?)
        })
        .await?;
    Ok(render(&value))
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

/// Connect once, then check every `interval` until cancelled.
pub(crate) async fn run_db_health(
    session: Arc<DatabaseSession>,
    query: String,
    log: EventLog,
    interval: Duration,
    cancel: CancellationToken,
) {
    if let Err(e) = session.connect().await {
        log.write_error(&format!(
            "Failed to connect to database {}: {}",
            session.path().display(),
            e
        ));
    }

    loop {
        match session.check(&query).await {
            Ok(value) => log.write_info(&format!("Database check OK: {}", value)),
            Err(e) => log.write_error(&format!("Database check failed: {}", e)),
        }

        if !sleep_or_cancelled(&cancel, interval).await {
            break;
        }
    }
    tracing::debug!("Database health task stopped");
}
