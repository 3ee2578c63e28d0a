use crate::db::article_repository::ArticleRepository;
use crate::db::current_issue;
use crate::db::filters::IssueFilter;
use crate::db::journal_repository::JournalRepository;
use crate::db::{begin_write, format_date, parse_date};
use crate::errors::AppError;
use crate::models::issue::{Issue, IssueDraft, IssueView};
use log::info;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as RusqliteResult};

pub struct IssueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> IssueRepository<'a> {
    // Base SELECT shared by every read so row mapping stays positional.
    const SELECT_FIELDS: &'static str = "SELECT i.id, i.journal_id, i.journal_type, i.title,
            i.cover_image, i.pdf_file, i.published_date, i.is_current, j.name, j.short_name
         FROM issues i JOIN journals j ON j.id = i.journal_id";

    const ORDER: &'static str = "ORDER BY i.published_date DESC, i.id DESC";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row_to_issue(row: &rusqlite::Row) -> RusqliteResult<Issue> {
        let published_date: String = row.get(6)?;
        Ok(Issue {
            id: row.get(0)?,
            journal_id: row.get(1)?,
            journal_type: row.get(2)?,
            title: row.get(3)?,
            cover_image: row.get(4)?,
            pdf_file: row.get(5)?,
            published_date: parse_date(6, &published_date)?,
            is_current: row.get(7)?,
            journal_name: row.get(8)?,
            journal_short_name: row.get(9)?,
        })
    }

    fn query(&self, where_sql: &str, values: &[Value]) -> Result<Vec<Issue>, AppError> {
        let sql = format!("{} {} {}", Self::SELECT_FIELDS, where_sql, Self::ORDER);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), Self::map_row_to_issue)?;
        Ok(rows.collect::<Result<Vec<Issue>, _>>()?)
    }

    pub fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>, AppError> {
        let sql = filter.to_sql();
        self.query(&sql.where_sql(), sql.values())
    }

    pub fn find(&self, id: i64) -> Result<Option<Issue>, AppError> {
        let sql = format!("{} WHERE i.id = ?1", Self::SELECT_FIELDS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_row_to_issue)
            .optional()?)
    }

    pub fn get(&self, id: i64) -> Result<Issue, AppError> {
        self.find(id)?
            .ok_or_else(|| AppError::NotFound(format!("Issue with ID {} not found", id)))
    }

    pub fn current_issues(&self) -> Result<Vec<Issue>, AppError> {
        self.query("WHERE i.is_current = 1", &[])
    }

    pub fn by_type(&self, journal_type: &str) -> Result<Vec<Issue>, AppError> {
        self.query(
            "WHERE COALESCE(i.journal_type, j.short_name) = ? COLLATE NOCASE",
            &[Value::Text(journal_type.trim().to_string())],
        )
    }

    pub fn current_for_type(&self, journal_type: &str) -> Result<Issue, AppError> {
        let code = journal_type.trim();
        self.query(
            "WHERE COALESCE(i.journal_type, j.short_name) = ? COLLATE NOCASE AND i.is_current = 1",
            &[Value::Text(code.to_string())],
        )?
        .into_iter()
        .next()
        .ok_or_else(|| {
            AppError::NotFound(format!("No current issue for journal type {}", code))
        })
    }

    pub fn latest(&self) -> Result<Issue, AppError> {
        let sql = format!("{} {} LIMIT 1", Self::SELECT_FIELDS, Self::ORDER);
        self.conn
            .query_row(&sql, [], Self::map_row_to_issue)
            .optional()?
            .ok_or_else(|| AppError::NotFound("No issues have been published yet".to_string()))
    }

    /// Resolves the owning journal and the target journal type for a draft.
    fn resolve_type(conn: &Connection, draft: &IssueDraft) -> Result<String, AppError> {
        let journal = JournalRepository::new(conn)
            .find(draft.journal)?
            .ok_or_else(|| {
                AppError::field("journal", format!("Journal with ID {} does not exist", draft.journal))
            })?;
        Ok(current_issue::resolve_journal_type(
            draft.journal_type.as_deref(),
            &journal.short_name,
        ))
    }

    pub fn create(&self, draft: &IssueDraft) -> Result<Issue, AppError> {
        let tx = begin_write(self.conn)?;
        let journal_type = Self::resolve_type(&tx, draft)?;

        if draft.is_current {
            current_issue::clear_others(&tx, &journal_type, None)?;
        }
        tx.execute(
            "INSERT INTO issues (journal_id, journal_type, title, cover_image, pdf_file,
                                 published_date, is_current)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                draft.journal,
                journal_type,
                draft.title,
                draft.cover_image,
                draft.pdf_file,
                format_date(&draft.published_date),
                draft.is_current,
            ],
        )
        .map_err(|e| current_issue::map_write_error(&tx, &journal_type, e))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("Created issue {} for journal type {}", id, journal_type);
        self.get(id)
    }

    /// Applies `draft` to issue `id`. Returns the updated issue and the upload
    /// paths it no longer references.
    pub fn update(&self, id: i64, draft: &IssueDraft) -> Result<(Issue, Vec<String>), AppError> {
        let tx = begin_write(self.conn)?;
        let before = IssueRepository::new(&tx).get(id)?;
        let journal_type = Self::resolve_type(&tx, draft)?;

        if draft.is_current {
            current_issue::clear_others(&tx, &journal_type, Some(id))?;
        }
        tx.execute(
            "UPDATE issues SET journal_id = ?1, journal_type = ?2, title = ?3, cover_image = ?4,
                               pdf_file = ?5, published_date = ?6, is_current = ?7
             WHERE id = ?8",
            params![
                draft.journal,
                journal_type,
                draft.title,
                draft.cover_image,
                draft.pdf_file,
                format_date(&draft.published_date),
                draft.is_current,
                id,
            ],
        )
        .map_err(|e| current_issue::map_write_error(&tx, &journal_type, e))?;
        tx.commit()?;

        let replaced = before
            .stored_files()
            .into_iter()
            .filter(|f| Some(f) != draft.cover_image.as_ref() && Some(f) != draft.pdf_file.as_ref())
            .collect();
        Ok((self.get(id)?, replaced))
    }

    pub fn set_current(&self, id: i64) -> Result<Issue, AppError> {
        current_issue::promote(self.conn, id)?;
        self.get(id)
    }

    /// Deletes the issue and its articles; returns the orphaned upload paths.
    pub fn delete(&self, id: i64) -> Result<Vec<String>, AppError> {
        let tx = begin_write(self.conn)?;
        let issue = IssueRepository::new(&tx).get(id)?;
        let mut files = issue.stored_files();
        {
            let mut stmt = tx.prepare(
                "SELECT article_file FROM articles WHERE issue_id = ?1 AND article_file IS NOT NULL",
            )?;
            let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
            files.extend(rows.collect::<Result<Vec<String>, _>>()?);
        }
        tx.execute("DELETE FROM issues WHERE id = ?1", params![id])?;
        tx.commit()?;
        info!("Deleted issue {} and its articles", id);
        Ok(files)
    }

    /// Wire representations with articles and their relations resolved in
    /// one batched query per relation.
    pub fn into_views(&self, issues: Vec<Issue>) -> Result<Vec<IssueView>, AppError> {
        let ids: Vec<i64> = issues.iter().map(|i| i.id).collect();
        let mut articles = ArticleRepository::new(self.conn).views_for_issues(&ids)?;
        Ok(issues
            .into_iter()
            .map(|issue| {
                let own = articles.remove(&issue.id).unwrap_or_default();
                IssueView::new(issue, own)
            })
            .collect())
    }

    pub fn into_view(&self, issue: Issue) -> Result<IssueView, AppError> {
        self.into_views(vec![issue])?
            .pop()
            .ok_or_else(|| AppError::InternalError("Issue view could not be built".to_string()))
    }

    pub fn count(&self) -> Result<i64, AppError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?)
    }
}
