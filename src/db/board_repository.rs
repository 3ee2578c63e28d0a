use crate::db::filters::BoardQuery;
use crate::db::is_foreign_key_violation;
use crate::errors::AppError;
use crate::models::board::{BoardMember, BoardMemberDraft, BoardRole};
use log::info;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as RusqliteResult};

pub struct BoardRepository<'a> {
    conn: &'a Connection,
}

impl<'a> BoardRepository<'a> {
    const SELECT_FIELDS: &'static str =
        "SELECT m.id, m.journal_id, m.full_name, m.position_description, m.role, m.display_order
         FROM board_members m JOIN journals j ON j.id = m.journal_id";

    const ORDER: &'static str = "ORDER BY m.display_order, m.id";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row_to_member(row: &rusqlite::Row) -> RusqliteResult<BoardMember> {
        let raw_role: String = row.get(4)?;
        let role = BoardRole::parse(&raw_role).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                Type::Text,
                format!("unknown board role {}", raw_role).into(),
            )
        })?;
        Ok(BoardMember {
            id: row.get(0)?,
            journal: row.get(1)?,
            full_name: row.get(2)?,
            position_description: row.get(3)?,
            role_display: role.label(),
            role,
            order: row.get(5)?,
        })
    }

    fn map_write_error(err: rusqlite::Error) -> AppError {
        if is_foreign_key_violation(&err) {
            AppError::field("journal", "Journal does not exist")
        } else {
            AppError::from(err)
        }
    }

    pub fn list(&self, query: &BoardQuery) -> Result<Vec<BoardMember>, AppError> {
        let filter = query.to_sql();
        let sql = format!("{} {} {}", Self::SELECT_FIELDS, filter.where_sql(), Self::ORDER);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(filter.values().iter()),
            Self::map_row_to_member,
        )?;
        Ok(rows.collect::<Result<Vec<BoardMember>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<BoardMember, AppError> {
        let sql = format!("{} WHERE m.id = ?1", Self::SELECT_FIELDS);
        self.conn
            .query_row(&sql, params![id], Self::map_row_to_member)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("Board member with ID {} not found", id)))
    }

    pub fn create(&self, draft: &BoardMemberDraft) -> Result<BoardMember, AppError> {
        self.conn
            .execute(
                "INSERT INTO board_members (journal_id, full_name, position_description, role, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    draft.journal,
                    draft.full_name,
                    draft.position_description,
                    draft.role.to_string(),
                    draft.order,
                ],
            )
            .map_err(Self::map_write_error)?;
        let id = self.conn.last_insert_rowid();
        info!("Added board member {} to journal {}", id, draft.journal);
        self.get(id)
    }

    pub fn update(&self, id: i64, draft: &BoardMemberDraft) -> Result<BoardMember, AppError> {
        let changed = self
            .conn
            .execute(
                "UPDATE board_members SET journal_id = ?1, full_name = ?2, position_description = ?3,
                                          role = ?4, display_order = ?5
                 WHERE id = ?6",
                params![
                    draft.journal,
                    draft.full_name,
                    draft.position_description,
                    draft.role.to_string(),
                    draft.order,
                    id,
                ],
            )
            .map_err(Self::map_write_error)?;
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "Board member with ID {} not found for update",
                id
            )));
        }
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> Result<(), AppError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM board_members WHERE id = ?1", params![id])?;
        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "Board member with ID {} not found",
                id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_in_memory;

    fn draft(journal: i64, name: &str, role: BoardRole, order: i64) -> BoardMemberDraft {
        BoardMemberDraft {
            journal,
            full_name: name.into(),
            position_description: "Professor".into(),
            role,
            order,
        }
    }

    fn seeded() -> Connection {
        let conn = init_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO journals (id, name, short_name) VALUES (1, 'Q', 'QX'), (2, 'A', 'AI');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn members_are_ordered_and_filtered() {
        let conn = seeded();
        let repo = BoardRepository::new(&conn);
        repo.create(&draft(1, "Member", BoardRole::Member, 2)).unwrap();
        repo.create(&draft(1, "Chief", BoardRole::ChiefEditor, 0))
            .unwrap();
        repo.create(&draft(2, "Other", BoardRole::Member, 1)).unwrap();

        let qx = repo
            .list(&BoardQuery {
                journal: Some("qx".into()),
                role: None,
            })
            .unwrap();
        let names: Vec<&str> = qx.iter().map(|m| m.full_name.as_str()).collect();
        assert_eq!(names, vec!["Chief", "Member"]);
        assert_eq!(qx[0].role_display, "Bosh muharrir");

        let members = repo
            .list(&BoardQuery {
                journal: None,
                role: Some("hayat_azosi".into()),
            })
            .unwrap();
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn unknown_journal_is_a_field_error() {
        let conn = seeded();
        let repo = BoardRepository::new(&conn);
        match repo.create(&draft(9, "X", BoardRole::Member, 0)).unwrap_err() {
            AppError::InvalidFields(fields) => assert_eq!(fields[0].field, "journal"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
