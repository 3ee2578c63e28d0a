use crate::errors::AppError;
use actix_web::web;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{types::Type, Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};

pub mod admin_repository;
pub mod article_repository;
pub mod author_repository;
pub mod board_repository;
pub mod contact_repository;
pub mod current_issue;
pub mod filters;
pub mod issue_repository;
pub mod journal_repository;
pub mod keyword_repository;
pub mod news_repository;
pub mod recent_issue_repository;
pub mod schema;

/// Shared handle to the SQLite store.
///
/// A single connection sits behind a mutex; every call runs on the blocking
/// pool so request handlers never hold the lock on an async worker.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = schema::init_db(path)?;
        Ok(Self::new(conn))
    }

    pub fn in_memory() -> Result<Self, AppError> {
        let conn = schema::init_in_memory()?;
        Ok(Self::new(conn))
    }

    pub async fn run<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        web::block(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::DatabaseError("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await?
    }

    /// Direct access for test fixtures.
    #[cfg(test)]
    pub(crate) fn lock_for_tests(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}

/// Starts a write transaction that takes the database write lock up front.
pub fn begin_write(conn: &Connection) -> Result<Transaction<'_>, AppError> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(AppError::from)
}

/// `?, ?, ?` for an `IN (...)` clause of `n` elements.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

pub fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| {
        NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|dt| dt.and_utc())
    })
}

pub fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Trims and lowercases the needle and wraps it for a `LIKE` match.
pub fn like_pattern(needle: &str) -> String {
    format!("%{}%", needle.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_match_count() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }

    #[test]
    fn timestamps_parse_sqlite_format() {
        let ts = parse_timestamp(Some("2024-05-01 10:20:30".to_string())).unwrap();
        assert_eq!(ts.format("%Y-%m-%dT%H:%M:%S").to_string(), "2024-05-01T10:20:30");
        assert!(parse_timestamp(Some("garbage".to_string())).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[actix_web::test]
    async fn run_executes_on_shared_connection() {
        let db = Database::in_memory().unwrap();
        db.run(|conn| {
            conn.execute(
                "INSERT INTO journals (name, short_name) VALUES ('A', 'AI')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();
        let count: i64 = db
            .run(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM journals", [], |r| r.get(0))?))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
