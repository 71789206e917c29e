/// Database layer for SpeedPay
///
/// Manages the SQLite connection pool, embedded migrations and the small
/// helpers shared by every repository (decimal columns, id collisions).

pub mod models;

use crate::error::{BankError, BankResult};
use rust_decimal::Decimal;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Connection, Row, Transaction};
use std::path::Path;
use std::str::FromStr;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> BankResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    sqlx::sqlite::SqliteJournalMode::Wal
                } else {
                    sqlx::sqlite::SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// Create a private in-memory database with the schema applied
///
/// A single connection is used so every query sees the same database.
pub async fn memory_pool() -> BankResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true),
        )
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> BankResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> BankResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Statement opening a transaction that holds the write lock from the start
///
/// A deferred transaction that reads and then writes cannot upgrade its lock
/// while another connection writes, and fails with `SQLITE_BUSY` without
/// waiting. Taking the lock up front lets the busy timeout queue writers.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Begin a write transaction on a pooled connection
pub async fn begin_write(pool: &SqlitePool) -> BankResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with(BEGIN_WRITE).await?)
}

/// Begin a write transaction on a connection already checked out
pub async fn begin_write_on(conn: &mut SqliteConnection) -> BankResult<Transaction<'_, Sqlite>> {
    Ok(conn.begin_with(BEGIN_WRITE).await?)
}

/// Read a decimal stored as TEXT
pub fn decimal_column(row: &SqliteRow, column: &str) -> BankResult<Decimal> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|e| BankError::Internal(format!("Corrupt decimal in column {}: {}", column, e)))
}

/// Whether an insert failed because the primary key `table.id` already exists
///
/// Conflicts on any other unique column are real errors and must propagate.
pub fn is_id_collision(err: &sqlx::Error, table: &str) -> bool {
    is_key_collision(err, table, "id")
}

/// Same as [`is_id_collision`] for tables keyed on another column
pub fn is_key_collision(err: &sqlx::Error, table: &str, column: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                && db_err.message().ends_with(&format!(" {}.{}", table, column))
        }
        _ => false,
    }
}

/// Whether an insert failed on any unique constraint
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pool_has_schema() {
        let pool = memory_pool().await.unwrap();
        test_connection(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
             ('customer', 'account', 'withdraw', 'deposit', 'transfer',
              'app_user', 'app_otp', 'app_user_token', 'web_user', 'web_token', 'pos_customer')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(count, 11);
    }

    #[tokio::test]
    async fn test_id_collision_detection() {
        let pool = memory_pool().await.unwrap();

        sqlx::query(
            "INSERT INTO account (id, account_type, balance, transaction_key, created_at)
             VALUES (?1, 'savings', '0', 1234, ?2)",
        )
        .bind(20000000001_i64)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let err = sqlx::query(
            "INSERT INTO account (id, account_type, balance, transaction_key, created_at)
             VALUES (?1, 'savings', '0', 1234, ?2)",
        )
        .bind(20000000001_i64)
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap_err();

        assert!(is_id_collision(&err, "account"));
        assert!(!is_id_collision(&err, "customer"));
        assert!(is_unique_violation(&err));
    }
}
