use crate::db::is_foreign_key_violation;
use crate::errors::AppError;
use crate::models::recent_issue::{RecentIssueLink, RecentIssueLinkDraft};
use rusqlite::{params, Connection, OptionalExtension, Result as RusqliteResult};

pub struct RecentIssueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> RecentIssueRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row_to_link(row: &rusqlite::Row) -> RusqliteResult<RecentIssueLink> {
        Ok(RecentIssueLink {
            id: row.get(0)?,
            title: row.get(1)?,
            link_to_issue: row.get(2)?,
            order: row.get(3)?,
        })
    }

    fn map_write_error(err: rusqlite::Error) -> AppError {
        if is_foreign_key_violation(&err) {
            AppError::field("link_to_issue", "Issue does not exist")
        } else {
            AppError::from(err)
        }
    }

    pub fn list(&self) -> Result<Vec<RecentIssueLink>, AppError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, issue_id, display_order FROM recent_issue_links
             ORDER BY display_order, id",
        )?;
        let rows = stmt.query_map([], Self::map_row_to_link)?;
        Ok(rows.collect::<Result<Vec<RecentIssueLink>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<RecentIssueLink, AppError> {
        self.conn
            .query_row(
                "SELECT id, title, issue_id, display_order FROM recent_issue_links WHERE id = ?1",
                params![id],
                Self::map_row_to_link,
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("Recent issue link with ID {} not found", id)))
    }

    pub fn create(&self, draft: &RecentIssueLinkDraft) -> Result<RecentIssueLink, AppError> {
        self.conn
            .execute(
                "INSERT INTO recent_issue_links (title, issue_id, display_order) VALUES (?1, ?2, ?3)",
                params![draft.title, draft.link_to_issue, draft.order],
            )
            .map_err(Self::map_write_error)?;
        self.get(self.conn.last_insert_rowid())
    }

    pub fn update(&self, id: i64, draft: &RecentIssueLinkDraft) -> Result<RecentIssueLink, AppError> {
        let changed = self
            .conn
            .execute(
                "UPDATE recent_issue_links SET title = ?1, issue_id = ?2, display_order = ?3
                 WHERE id = ?4",
                params![draft.title, draft.link_to_issue, draft.order, id],
            )
            .map_err(Self::map_write_error)?;
        if changed == 0 {
            return Err(AppError::NotFound(format!(
                "Recent issue link with ID {} not found for update",
                id
            )));
        }
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> Result<(), AppError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM recent_issue_links WHERE id = ?1", params![id])?;
        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "Recent issue link with ID {} not found",
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

    fn draft(title: &str, link: Option<i64>, order: i64) -> RecentIssueLinkDraft {
        RecentIssueLinkDraft {
            title: title.into(),
            link_to_issue: link,
            order,
        }
    }

    #[test]
    fn links_follow_display_order_and_survive_issue_deletion() {
        let conn = init_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO journals (id, name, short_name) VALUES (1, 'Q', 'QX');
             INSERT INTO issues (id, journal_id, title, published_date) VALUES (1, 1, 'T', '2024-01-01');",
        )
        .unwrap();
        let repo = RecentIssueRepository::new(&conn);
        repo.create(&draft("Second", None, 2)).unwrap();
        let first = repo.create(&draft("First", Some(1), 1)).unwrap();

        let titles: Vec<String> = repo.list().unwrap().into_iter().map(|l| l.title).collect();
        assert_eq!(titles, vec!["First", "Second"]);

        conn.execute("DELETE FROM issues WHERE id = 1", []).unwrap();
        assert_eq!(repo.get(first.id).unwrap().link_to_issue, None);
    }

    #[test]
    fn unknown_issue_is_a_field_error() {
        let conn = init_in_memory().unwrap();
        let repo = RecentIssueRepository::new(&conn);
        match repo.create(&draft("X", Some(42), 0)).unwrap_err() {
            AppError::InvalidFields(fields) => assert_eq!(fields[0].field, "link_to_issue"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
