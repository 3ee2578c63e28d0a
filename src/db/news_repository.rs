use crate::db::filters::SearchQuery;
use crate::db::parse_timestamp;
use crate::errors::AppError;
use crate::models::news::{News, NewsDraft};
use log::info;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as RusqliteResult};

pub struct NewsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> NewsRepository<'a> {
    const SELECT_FIELDS: &'static str = "SELECT id, title, content, image, created_at FROM news";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row_to_news(row: &rusqlite::Row) -> RusqliteResult<News> {
        Ok(News {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            image: row.get(3)?,
            created_at: parse_timestamp(row.get(4)?),
        })
    }

    /// Newest first.
    pub fn list(&self, query: &SearchQuery) -> Result<Vec<News>, AppError> {
        let filter = query.to_sql(&["title", "content"]);
        let sql = format!(
            "{} {} ORDER BY created_at DESC, id DESC",
            Self::SELECT_FIELDS,
            filter.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(filter.values().iter()), Self::map_row_to_news)?;
        Ok(rows.collect::<Result<Vec<News>, _>>()?)
    }

    pub fn find(&self, id: i64) -> Result<Option<News>, AppError> {
        let sql = format!("{} WHERE id = ?1", Self::SELECT_FIELDS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_row_to_news)
            .optional()?)
    }

    pub fn get(&self, id: i64) -> Result<News, AppError> {
        self.find(id)?
            .ok_or_else(|| AppError::NotFound(format!("News item with ID {} not found", id)))
    }

    pub fn create(&self, draft: &NewsDraft) -> Result<News, AppError> {
        self.conn.execute(
            "INSERT INTO news (title, content, image) VALUES (?1, ?2, ?3)",
            params![draft.title, draft.content, draft.image],
        )?;
        let id = self.conn.last_insert_rowid();
        info!("Published news item {}", id);
        self.get(id)
    }

    /// Returns the updated item and the image path it no longer references.
    pub fn update(&self, id: i64, draft: &NewsDraft) -> Result<(News, Option<String>), AppError> {
        let before = self.get(id)?;
        self.conn.execute(
            "UPDATE news SET title = ?1, content = ?2, image = ?3 WHERE id = ?4",
            params![draft.title, draft.content, draft.image, id],
        )?;
        let replaced = before.image.filter(|old| Some(old) != draft.image.as_ref());
        Ok((self.get(id)?, replaced))
    }

    /// Returns the image path of the removed item, if any.
    pub fn delete(&self, id: i64) -> Result<Option<String>, AppError> {
        let news = self.get(id)?;
        self.conn
            .execute("DELETE FROM news WHERE id = ?1", params![id])?;
        Ok(news.image)
    }
}
