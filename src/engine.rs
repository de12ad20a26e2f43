//! Execution engine for converted scripts.
//!
//! Statements are handed to a target one at a time. The target reports
//! each rejection; what happens next depends on the [`OnError`] policy.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{ConvertError, ConvertResult};

/// What to do when the target rejects a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Run everything in one transaction; roll back at the first rejection.
    #[default]
    Abort,
    /// Run every statement on its own and collect the rejections.
    Continue,
}

/// A database that accepts rewritten statements.
#[allow(async_fn_in_trait)]
pub trait Execute {
    /// Execute one statement, returning the affected row count.
    async fn execute(&mut self, statement: &str) -> Result<u64, String>;

    async fn begin(&mut self) -> ConvertResult<()>;

    async fn commit(&mut self) -> ConvertResult<()>;

    async fn rollback(&mut self) -> ConvertResult<()>;
}

/// A SQLite database file opened through sqlx.
pub struct SqliteTarget {
    conn: SqliteConnection,
}

impl SqliteTarget {
    /// Open (or create) a SQLite database file.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let target = SqliteTarget::open("shop.sqlite").await?;
    /// ```
    pub async fn open(path: impl AsRef<Path>) -> ConvertResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        Self::connect_with(options).await
    }

    /// Open an in-memory database.
    pub async fn memory() -> ConvertResult<Self> {
        let options: SqliteConnectOptions = "sqlite::memory:"
            .parse()
            .map_err(|e: sqlx::Error| ConvertError::Connection(e.to_string()))?;
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> ConvertResult<Self> {
        let conn = options
            .connect()
            .await
            .map_err(|e| ConvertError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a mutable reference to the underlying connection.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Close the connection cleanly.
    pub async fn close(self) -> ConvertResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| ConvertError::Connection(e.to_string()))
    }
}

impl Execute for SqliteTarget {
    async fn execute(&mut self, statement: &str) -> Result<u64, String> {
        sqlx::query(statement)
            .execute(&mut self.conn)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| e.to_string())
    }

    async fn begin(&mut self) -> ConvertResult<()> {
        self.raw("BEGIN").await
    }

    async fn commit(&mut self) -> ConvertResult<()> {
        self.raw("COMMIT").await
    }

    async fn rollback(&mut self) -> ConvertResult<()> {
        self.raw("ROLLBACK").await
    }
}

impl SqliteTarget {
    async fn raw(&mut self, sql: &str) -> ConvertResult<()> {
        sqlx::query(sql)
            .execute(&mut self.conn)
            .await
            .map(|_| ())
            .map_err(|e| ConvertError::Transaction(format!("{}: {}", sql, e)))
    }
}

/// A statement the target refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// 1-based position in the script.
    pub index: usize,
    pub statement: String,
    pub message: String,
}

impl From<Failure> for ConvertError {
    fn from(f: Failure) -> Self {
        ConvertError::rejected(f.index, f.statement, f.message)
    }
}

/// Outcome of applying a script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Statements the target accepted (and, under `Abort`, kept).
    pub executed: usize,
    pub failures: Vec<Failure>,
    /// Whether the batch was rolled back.
    pub rolled_back: bool,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply statements to a target under the given policy.
///
/// Engine rejections are collected in the report; only transaction control
/// failures are returned as errors.
pub async fn apply<T, I, S>(target: &mut T, statements: I, policy: OnError) -> ConvertResult<ApplyReport>
where
    T: Execute,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    apply_with(target, statements, policy, |_, _| {}).await
}

/// Like [`apply`], calling `on_statement(index, statement)` before each one.
pub async fn apply_with<T, I, S, F>(
    target: &mut T,
    statements: I,
    policy: OnError,
    mut on_statement: F,
) -> ConvertResult<ApplyReport>
where
    T: Execute,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(usize, &str),
{
    let mut report = ApplyReport::default();

    if policy == OnError::Abort {
        target.begin().await?;
    }

    for (i, stmt) in statements.into_iter().enumerate() {
        let stmt = stmt.as_ref();
        let index = i + 1;
        on_statement(index, stmt);

        match target.execute(stmt).await {
            Ok(_) => report.executed += 1,
            Err(message) => {
                warn!("Statement {} rejected: {}", index, message);
                report.failures.push(Failure {
                    index,
                    statement: stmt.to_string(),
                    message,
                });
                if policy == OnError::Abort {
                    target.rollback().await?;
                    report.executed = 0;
                    report.rolled_back = true;
                    return Ok(report);
                }
            }
        }
    }

    if policy == OnError::Abort {
        target.commit().await?;
    }

    info!(
        "Applied {} statement(s), {} rejected",
        report.executed,
        report.failures.len()
    );
    Ok(report)
}
