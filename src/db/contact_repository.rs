use crate::db::filters::ContactQuery;
use crate::db::{parse_timestamp, placeholders};
use crate::errors::AppError;
use crate::models::contact::{ContactMessage, ContactMessageFile, ContactMessagePayload};
use log::info;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as RusqliteResult};
use std::collections::HashMap;

pub struct ContactRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ContactRepository<'a> {
    const SELECT_FIELDS: &'static str =
        "SELECT id, name, email, subject, message, is_read, created_at FROM contact_messages";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row_to_message(row: &rusqlite::Row) -> RusqliteResult<ContactMessage> {
        Ok(ContactMessage {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            subject: row.get(3)?,
            message: row.get(4)?,
            is_read: row.get(5)?,
            created_at: parse_timestamp(row.get(6)?),
            files: Vec::new(),
        })
    }

    fn map_row_to_file(row: &rusqlite::Row) -> RusqliteResult<ContactMessageFile> {
        Ok(ContactMessageFile::new(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            parse_timestamp(row.get(3)?),
        ))
    }

    fn files_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<ContactMessageFile>>, AppError> {
        let mut grouped: HashMap<i64, Vec<ContactMessageFile>> = HashMap::new();
        if ids.is_empty() {
            return Ok(grouped);
        }
        let sql = format!(
            "SELECT id, message_id, file, uploaded_at FROM contact_message_files
             WHERE message_id IN ({}) ORDER BY id",
            placeholders(ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), Self::map_row_to_file)?;
        for file in rows {
            let file = file?;
            grouped.entry(file.message).or_default().push(file);
        }
        Ok(grouped)
    }

    fn with_files(&self, mut messages: Vec<ContactMessage>) -> Result<Vec<ContactMessage>, AppError> {
        let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        let mut files = self.files_for(&ids)?;
        for message in messages.iter_mut() {
            message.files = files.remove(&message.id).unwrap_or_default();
        }
        Ok(messages)
    }

    /// Newest first, each with its attachments.
    pub fn list(&self, query: &ContactQuery) -> Result<Vec<ContactMessage>, AppError> {
        let filter = query.to_sql();
        let sql = format!(
            "{} {} ORDER BY created_at DESC, id DESC",
            Self::SELECT_FIELDS,
            filter.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(filter.values().iter()),
            Self::map_row_to_message,
        )?;
        let messages = rows.collect::<Result<Vec<ContactMessage>, _>>()?;
        self.with_files(messages)
    }

    pub fn get(&self, id: i64) -> Result<ContactMessage, AppError> {
        let sql = format!("{} WHERE id = ?1", Self::SELECT_FIELDS);
        let message = self
            .conn
            .query_row(&sql, params![id], Self::map_row_to_message)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("Contact message with ID {} not found", id)))?;
        self.with_files(vec![message])?
            .pop()
            .ok_or_else(|| AppError::InternalError("Contact message vanished".to_string()))
    }

    pub fn create(&self, payload: &ContactMessagePayload) -> Result<ContactMessage, AppError> {
        self.conn.execute(
            "INSERT INTO contact_messages (name, email, subject, message) VALUES (?1, ?2, ?3, ?4)",
            params![payload.name, payload.email, payload.subject, payload.message],
        )?;
        let id = self.conn.last_insert_rowid();
        info!("Stored contact message {} from {}", id, payload.email);
        self.get(id)
    }

    pub fn set_read(&self, id: i64, is_read: bool) -> Result<ContactMessage, AppError> {
        let changed = self.conn.execute(
            "UPDATE contact_messages SET is_read = ?1 WHERE id = ?2",
            params![is_read, id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "Contact message with ID {} not found",
                id
            )));
        }
        self.get(id)
    }

    /// Records an already stored upload as an attachment of `message_id`.
    pub fn add_file(&self, message_id: i64, path: &str) -> Result<ContactMessageFile, AppError> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM contact_messages WHERE id = ?1",
                params![message_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Contact message with ID {} not found",
                message_id
            )));
        }
        self.conn.execute(
            "INSERT INTO contact_message_files (message_id, file) VALUES (?1, ?2)",
            params![message_id, path],
        )?;
        Ok(self.conn.query_row(
            "SELECT id, message_id, file, uploaded_at FROM contact_message_files WHERE id = ?1",
            params![self.conn.last_insert_rowid()],
            Self::map_row_to_file,
        )?)
    }

    /// Deletes the message and its attachment rows; returns the attachment paths.
    pub fn delete(&self, id: i64) -> Result<Vec<String>, AppError> {
        let message = self.get(id)?;
        self.conn
            .execute("DELETE FROM contact_messages WHERE id = ?1", params![id])?;
        Ok(message.files.into_iter().map(|f| f.file).collect())
    }

    pub fn count_unread(&self) -> Result<i64, AppError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM contact_messages WHERE is_read = 0",
            [],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_in_memory;

    fn payload(name: &str, subject: &str) -> ContactMessagePayload {
        ContactMessagePayload {
            name: name.into(),
            email: "reader@example.uz".into(),
            subject: subject.into(),
            message: "Hello".into(),
        }
    }

    #[test]
    fn attachments_are_embedded_and_returned_on_delete() {
        let conn = init_in_memory().unwrap();
        let repo = ContactRepository::new(&conn);
        let msg = repo.create(&payload("Dilnoza", "Submission")).unwrap();
        assert!(msg.files.is_empty());

        let file = repo.add_file(msg.id, "contact/a.pdf").unwrap();
        assert_eq!(file.url.as_deref(), Some("/media/contact/a.pdf"));
        let fetched = repo.get(msg.id).unwrap();
        assert_eq!(fetched.files.len(), 1);

        assert_eq!(repo.delete(msg.id).unwrap(), vec!["contact/a.pdf".to_string()]);
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM contact_message_files", [], |r| r.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn attaching_to_missing_message_is_not_found() {
        let conn = init_in_memory().unwrap();
        let repo = ContactRepository::new(&conn);
        assert!(matches!(
            repo.add_file(5, "contact/a.pdf"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn read_flag_filters_and_counts() {
        let conn = init_in_memory().unwrap();
        let repo = ContactRepository::new(&conn);
        let first = repo.create(&payload("A", "Question")).unwrap();
        repo.create(&payload("B", "Review request")).unwrap();
        repo.set_read(first.id, true).unwrap();

        let unread = repo
            .list(&ContactQuery {
                is_read: Some("false".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].name, "B");
        assert_eq!(repo.count_unread().unwrap(), 1);

        let searched = repo
            .list(&ContactQuery {
                search: Some("review".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
    }
}
