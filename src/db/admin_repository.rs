use crate::errors::AppError;
use crate::models::admin::Admin;
use rusqlite::{params, Connection, OptionalExtension};

pub struct AdminRepository<'a> {
    conn: &'a Connection,
}

impl<'a> AdminRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<Admin>, AppError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, email, password_hash FROM admins WHERE email = ?1 COLLATE NOCASE",
                params![email],
                |row| {
                    Ok(Admin {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    /// Inserts the admin, or replaces the password of an existing one.
    pub fn upsert(&self, email: &str, password_hash: &str) -> Result<i64, AppError> {
        self.conn.execute(
            "INSERT INTO admins (email, password_hash) VALUES (?1, ?2)
             ON CONFLICT(email) DO UPDATE SET password_hash = excluded.password_hash",
            params![email, password_hash],
        )?;
        Ok(self.conn.query_row(
            "SELECT id FROM admins WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_in_memory;

    #[test]
    fn upsert_replaces_password_hash() {
        let conn = init_in_memory().unwrap();
        let repo = AdminRepository::new(&conn);
        let id = repo.upsert("editor@journal.uz", "hash-1").unwrap();
        assert_eq!(repo.upsert("editor@journal.uz", "hash-2").unwrap(), id);

        let admin = repo.find_by_email("Editor@Journal.uz").unwrap().unwrap();
        assert_eq!(admin.password_hash, "hash-2");
        assert!(repo.find_by_email("nobody@journal.uz").unwrap().is_none());
    }
}
