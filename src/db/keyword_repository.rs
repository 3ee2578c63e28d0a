use crate::db::filters::SearchQuery;
use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::author::Keyword;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as RusqliteResult};

pub struct KeywordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> KeywordRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row_to_keyword(row: &rusqlite::Row) -> RusqliteResult<Keyword> {
        Ok(Keyword {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    fn map_write_error(err: rusqlite::Error) -> AppError {
        if is_unique_violation(&err) {
            AppError::field("name", "This keyword already exists")
        } else {
            AppError::from(err)
        }
    }

    pub fn list(&self, query: &SearchQuery) -> Result<Vec<Keyword>, AppError> {
        let filter = query.to_sql(&["name"]);
        let sql = format!(
            "SELECT id, name FROM keywords {} ORDER BY name",
            filter.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(filter.values().iter()),
            Self::map_row_to_keyword,
        )?;
        Ok(rows.collect::<Result<Vec<Keyword>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<Keyword, AppError> {
        self.conn
            .query_row(
                "SELECT id, name FROM keywords WHERE id = ?1",
                params![id],
                Self::map_row_to_keyword,
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("Keyword with ID {} not found", id)))
    }

    pub fn create(&self, name: &str) -> Result<Keyword, AppError> {
        self.conn
            .execute("INSERT INTO keywords (name) VALUES (?1)", params![name])
            .map_err(Self::map_write_error)?;
        self.get(self.conn.last_insert_rowid())
    }

    pub fn update(&self, id: i64, name: &str) -> Result<Keyword, AppError> {
        let changed = self
            .conn
            .execute(
                "UPDATE keywords SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .map_err(Self::map_write_error)?;
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "Keyword with ID {} not found for update",
                id
            )));
        }
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> Result<(), AppError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM keywords WHERE id = ?1", params![id])?;
        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("Keyword with ID {} not found", id)));
        }
        Ok(())
    }
}
