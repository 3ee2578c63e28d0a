use crate::db::{begin_write, current_issue, is_unique_violation};
use crate::errors::AppError;
use crate::models::journal::{Journal, JournalDraft};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Result as RusqliteResult};

pub struct JournalRepository<'a> {
    conn: &'a Connection,
}

impl<'a> JournalRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row_to_journal(row: &rusqlite::Row) -> RusqliteResult<Journal> {
        Ok(Journal {
            id: row.get(0)?,
            name: row.get(1)?,
            short_name: row.get(2)?,
        })
    }

    fn map_write_error(err: rusqlite::Error) -> AppError {
        if is_unique_violation(&err) {
            AppError::field("short_name", "A journal with this short name already exists")
        } else {
            AppError::from(err)
        }
    }

    pub fn list(&self) -> Result<Vec<Journal>, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, short_name FROM journals ORDER BY id")?;
        let rows = stmt.query_map([], Self::map_row_to_journal)?;
        Ok(rows.collect::<Result<Vec<Journal>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Journal, AppError> {
        self.find(id)?
            .ok_or_else(|| AppError::NotFound(format!("Journal with ID {} not found", id)))
    }

    pub fn find(&self, id: i64) -> Result<Option<Journal>, AppError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, short_name FROM journals WHERE id = ?1",
                params![id],
                Self::map_row_to_journal,
            )
            .optional()?)
    }

    pub fn create(&self, draft: &JournalDraft) -> Result<Journal, AppError> {
        self.conn
            .execute(
                "INSERT INTO journals (name, short_name) VALUES (?1, ?2)",
                params![draft.name, draft.short_name],
            )
            .map_err(Self::map_write_error)?;
        self.get(self.conn.last_insert_rowid())
    }

    /// Renaming the short code re-tags the journal's issues that carried the
    /// old code, in the same transaction.
    pub fn update(&self, id: i64, draft: &JournalDraft) -> Result<Journal, AppError> {
        let tx = begin_write(self.conn)?;
        let previous: String = tx
            .query_row(
                "SELECT short_name FROM journals WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| {
                AppError::NotFound(format!("Journal with ID {} not found for update", id))
            })?;

        tx.execute(
            "UPDATE journals SET name = ?1, short_name = ?2 WHERE id = ?3",
            params![draft.name, draft.short_name, id],
        )
        .map_err(Self::map_write_error)?;

        let new_type = current_issue::resolve_journal_type(None, &draft.short_name);
        if previous.trim().to_uppercase() != new_type {
            let retagged = tx
                .execute(
                    "UPDATE issues SET journal_type = ?1
                     WHERE journal_id = ?2 AND journal_type = ?3 COLLATE NOCASE",
                    params![new_type, id, previous.trim()],
                )
                .map_err(|e| current_issue::map_write_error(&tx, &new_type, e))?;
            info!(
                "Journal {} renamed from {} to {}; re-tagged {} issue(s)",
                id, previous, new_type, retagged
            );
        }
        tx.commit()?;
        self.get(id)
    }

    /// Deletes the journal with its issues, articles and board members.
    /// Returns the upload paths that belonged to the removed rows.
    pub fn delete(&self, id: i64) -> Result<Vec<String>, AppError> {
        let tx = begin_write(self.conn)?;
        let files = {
            let mut stmt = tx.prepare(
                "SELECT cover_image FROM issues WHERE journal_id = ?1
                 UNION ALL SELECT pdf_file FROM issues WHERE journal_id = ?1
                 UNION ALL SELECT a.article_file FROM articles a
                     JOIN issues i ON i.id = a.issue_id WHERE i.journal_id = ?1",
            )?;
            let rows = stmt.query_map(params![id], |row| row.get::<_, Option<String>>(0))?;
            rows.collect::<Result<Vec<Option<String>>, _>>()?
                .into_iter()
                .flatten()
                .collect::<Vec<String>>()
        };

        let rows_affected = tx.execute("DELETE FROM journals WHERE id = ?1", params![id])?;
        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("Journal with ID {} not found", id)));
        }
        tx.commit()?;
        info!("Deleted journal {} and its issues and board members", id);
        Ok(files)
    }

    pub fn count(&self) -> Result<i64, AppError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM journals", [], |row| row.get(0))?)
    }
}
