use crate::db::filters::SearchQuery;
use crate::errors::AppError;
use crate::models::author::{Author, AuthorDraft};
use log::info;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as RusqliteResult};

/// Author columns, expecting the table aliased `au`.
pub const AUTHOR_COLUMNS: &str =
    "au.id, au.last_name, au.first_name, au.patronymic, au.orcid_id, au.organization, au.position";

/// Maps [`AUTHOR_COLUMNS`] starting at column `offset`.
pub fn map_author(row: &rusqlite::Row, offset: usize) -> RusqliteResult<Author> {
    Ok(Author {
        id: row.get(offset)?,
        last_name: row.get(offset + 1)?,
        first_name: row.get(offset + 2)?,
        patronymic: row.get(offset + 3)?,
        orcid_id: row.get(offset + 4)?,
        organization: row.get(offset + 5)?,
        position: row.get(offset + 6)?,
    })
}

pub struct AuthorRepository<'a> {
    conn: &'a Connection,
}

impl<'a> AuthorRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn list(&self, query: &SearchQuery) -> Result<Vec<Author>, AppError> {
        let filter = query.to_sql(&["au.last_name", "au.first_name", "au.patronymic", "au.orcid_id"]);
        let sql = format!(
            "SELECT {} FROM authors au {} ORDER BY au.last_name, au.first_name, au.id",
            AUTHOR_COLUMNS,
            filter.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(filter.values().iter()), |row| {
            map_author(row, 0)
        })?;
        Ok(rows.collect::<Result<Vec<Author>, _>>()?)
    }

    pub fn find(&self, id: i64) -> Result<Option<Author>, AppError> {
        let sql = format!("SELECT {} FROM authors au WHERE au.id = ?1", AUTHOR_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], |row| map_author(row, 0))
            .optional()?)
    }

    pub fn get(&self, id: i64) -> Result<Author, AppError> {
        self.find(id)?
            .ok_or_else(|| AppError::NotFound(format!("Author with ID {} not found", id)))
    }

    pub fn create(&self, draft: &AuthorDraft) -> Result<Author, AppError> {
        self.conn.execute(
            "INSERT INTO authors (last_name, first_name, patronymic, orcid_id, organization, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                draft.last_name,
                draft.first_name,
                draft.patronymic,
                draft.orcid_id,
                draft.organization,
                draft.position,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!("Created author {} ({} {})", id, draft.last_name, draft.first_name);
        self.get(id)
    }

    pub fn update(&self, id: i64, draft: &AuthorDraft) -> Result<Author, AppError> {
        let changed = self.conn.execute(
            "UPDATE authors SET last_name = ?1, first_name = ?2, patronymic = ?3, orcid_id = ?4,
                                organization = ?5, position = ?6
             WHERE id = ?7",
            params![
                draft.last_name,
                draft.first_name,
                draft.patronymic,
                draft.orcid_id,
                draft.organization,
                draft.position,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "Author with ID {} not found for update",
                id
            )));
        }
        self.get(id)
    }

    /// Removes the author from every article it was linked to.
    pub fn delete(&self, id: i64) -> Result<(), AppError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM authors WHERE id = ?1", params![id])?;
        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("Author with ID {} not found", id)));
        }
        info!("Deleted author {}", id);
        Ok(())
    }
}
