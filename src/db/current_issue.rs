//! Keeps at most one current issue per journal type.
//!
//! Writers clear the flag on every other issue of the same type inside their
//! own transaction before setting it. The partial unique index
//! `idx_issues_one_current_per_type` rejects anything that slips past that.

use crate::db::{begin_write, is_unique_violation};
use crate::errors::AppError;
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};

/// Stored type, or the owning journal's short code for rows that never had one.
const EFFECTIVE_TYPE: &str = "COALESCE(NULLIF(TRIM(issues.journal_type), ''),
    (SELECT j.short_name FROM journals j WHERE j.id = issues.journal_id))";

/// Explicit type (trimmed, upper-cased) when given, else the journal's short code.
pub fn resolve_journal_type(explicit: Option<&str>, journal_short_name: &str) -> String {
    explicit
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .unwrap_or(journal_short_name.trim())
        .to_uppercase()
}

/// Clears `is_current` on every issue of `journal_type` except `keep`.
pub fn clear_others(
    conn: &Connection,
    journal_type: &str,
    keep: Option<i64>,
) -> Result<usize, AppError> {
    let cleared = conn.execute(
        &format!(
            "UPDATE issues SET is_current = 0
             WHERE {} = ?1 COLLATE NOCASE AND is_current = 1 AND id IS NOT ?2",
            EFFECTIVE_TYPE
        ),
        params![journal_type, keep],
    )?;
    if cleared > 0 {
        info!(
            "Cleared current flag on {} issue(s) of journal type {}",
            cleared, journal_type
        );
    }
    Ok(cleared)
}

/// The issue currently flagged for `journal_type`, as `(id, title)`.
pub fn holder(conn: &Connection, journal_type: &str) -> Result<Option<(i64, String)>, AppError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT id, title FROM issues
                 WHERE {} = ?1 COLLATE NOCASE AND is_current = 1 ORDER BY id LIMIT 1",
                EFFECTIVE_TYPE
            ),
            params![journal_type],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

/// Maps a failed issue write, naming the conflicting issue when the
/// one-current-per-type index fired.
pub fn map_write_error(conn: &Connection, journal_type: &str, err: rusqlite::Error) -> AppError {
    if !is_unique_violation(&err) {
        return AppError::from(err);
    }
    warn!(
        "Concurrent current-issue write rejected for journal type {}",
        journal_type
    );
    match holder(conn, journal_type) {
        Ok(Some((id, title))) => AppError::Conflict(format!(
            "Issue '{}' (ID {}) is already the current issue for journal type {}",
            title, id, journal_type
        )),
        _ => AppError::Conflict(format!(
            "Another issue is already the current issue for journal type {}",
            journal_type
        )),
    }
}

/// Makes `issue_id` the only current issue of its journal type.
/// Returns the journal type that was promoted within.
pub fn promote(conn: &Connection, issue_id: i64) -> Result<String, AppError> {
    let tx = begin_write(conn)?;

    let (stored, short_name): (Option<String>, String) = tx
        .query_row(
            "SELECT i.journal_type, j.short_name FROM issues i
             JOIN journals j ON j.id = i.journal_id WHERE i.id = ?1",
            params![issue_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Issue with ID {} not found", issue_id)))?;

    let journal_type = resolve_journal_type(stored.as_deref(), &short_name);

    clear_others(&tx, &journal_type, Some(issue_id))?;
    tx.execute(
        "UPDATE issues SET is_current = 1, journal_type = ?1 WHERE id = ?2",
        params![journal_type, issue_id],
    )
    .map_err(|e| map_write_error(&tx, &journal_type, e))?;

    tx.commit()?;
    info!(
        "Issue {} is now the current issue for journal type {}",
        issue_id, journal_type
    );
    Ok(journal_type)
}
