use crate::db::author_repository::{map_author, AUTHOR_COLUMNS};
use crate::db::filters::ArticleFilter;
use crate::db::{begin_write, placeholders};
use crate::errors::AppError;
use crate::models::article::{
    Article, ArticleDraft, ArticleView, Language, Translation, TranslationsChange,
};
use crate::models::author::{Author, Keyword};
use log::{debug, info};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as RusqliteResult};
use std::collections::{BTreeSet, HashMap};

/// Membership and translation changes that accompany an article write.
#[derive(Debug)]
pub struct ArticleRelations {
    /// `None` keeps the stored authors; `Some` replaces them entirely.
    pub authors: Option<Vec<i64>>,
    pub keywords: Option<Vec<i64>>,
    pub translations: TranslationsChange,
}

/// A many-to-many link table between articles and another entity.
struct Membership {
    link_table: &'static str,
    column: &'static str,
    target_table: &'static str,
    field: &'static str,
}

const AUTHORS: Membership = Membership {
    link_table: "article_authors",
    column: "author_id",
    target_table: "authors",
    field: "authors",
};

const KEYWORDS: Membership = Membership {
    link_table: "article_keywords",
    column: "keyword_id",
    target_table: "keywords",
    field: "keywords",
};

pub struct ArticleRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ArticleRepository<'a> {
    const SELECT_FIELDS: &'static str =
        "SELECT a.id, a.issue_id, a.doi, a.pages, a.references_text, a.article_file, a.views
         FROM articles a";

    const ORDER: &'static str = "ORDER BY a.pages, a.id";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn map_row_to_article(row: &rusqlite::Row) -> RusqliteResult<Article> {
        Ok(Article {
            id: row.get(0)?,
            issue_id: row.get(1)?,
            doi: row.get(2)?,
            pages: row.get(3)?,
            references: row.get(4)?,
            article_file: row.get(5)?,
            views: row.get(6)?,
        })
    }

    fn query(&self, where_sql: &str, values: &[Value]) -> Result<Vec<Article>, AppError> {
        let sql = format!("{} {} {}", Self::SELECT_FIELDS, where_sql, Self::ORDER);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), Self::map_row_to_article)?;
        Ok(rows.collect::<Result<Vec<Article>, _>>()?)
    }

    pub fn list(&self, filter: &ArticleFilter) -> Result<Vec<ArticleView>, AppError> {
        let sql = filter.to_sql();
        let articles = self.query(&sql.where_sql(), sql.values())?;
        self.into_views(articles)
    }

    pub fn find(&self, id: i64) -> Result<Option<Article>, AppError> {
        let sql = format!("{} WHERE a.id = ?1", Self::SELECT_FIELDS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_row_to_article)
            .optional()?)
    }

    pub fn get(&self, id: i64) -> Result<Article, AppError> {
        self.find(id)?
            .ok_or_else(|| AppError::NotFound(format!("Article with ID {} not found", id)))
    }

    pub fn get_view(&self, id: i64) -> Result<ArticleView, AppError> {
        let article = self.get(id)?;
        self.into_views(vec![article])?
            .pop()
            .ok_or_else(|| AppError::InternalError("Article view could not be built".to_string()))
    }

    /// Articles of the given issues, grouped by issue id.
    pub fn views_for_issues(
        &self,
        issue_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<ArticleView>>, AppError> {
        let mut grouped: HashMap<i64, Vec<ArticleView>> = HashMap::new();
        if issue_ids.is_empty() {
            return Ok(grouped);
        }
        let where_sql = format!("WHERE a.issue_id IN ({})", placeholders(issue_ids.len()));
        let values: Vec<Value> = issue_ids.iter().map(|id| Value::Integer(*id)).collect();
        let articles = self.query(&where_sql, &values)?;
        for view in self.into_views(articles)? {
            grouped.entry(view.issue).or_default().push(view);
        }
        Ok(grouped)
    }

    /// Resolves authors, keywords and translations for every article with one
    /// query per relation.
    pub fn into_views(&self, articles: Vec<Article>) -> Result<Vec<ArticleView>, AppError> {
        if articles.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
        let mut authors = self.authors_for(&ids)?;
        let mut keywords = self.keywords_for(&ids)?;
        let mut translations = self.translations_for(&ids)?;
        debug!("Prefetched relations for {} article(s)", ids.len());

        Ok(articles
            .into_iter()
            .map(|article| {
                let id = article.id;
                ArticleView::new(
                    article,
                    authors.remove(&id).unwrap_or_default(),
                    keywords.remove(&id).unwrap_or_default(),
                    translations.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }

    fn grouped<T, F>(&self, sql: &str, ids: &[i64], map: F) -> Result<HashMap<i64, Vec<T>>, AppError>
    where
        F: Fn(&rusqlite::Row) -> RusqliteResult<(i64, T)>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), map)?;
        let mut out: HashMap<i64, Vec<T>> = HashMap::new();
        for row in rows {
            let (article_id, item) = row?;
            out.entry(article_id).or_default().push(item);
        }
        Ok(out)
    }

    fn authors_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<Author>>, AppError> {
        let sql = format!(
            "SELECT aa.article_id, {} FROM article_authors aa
             JOIN authors au ON au.id = aa.author_id
             WHERE aa.article_id IN ({})
             ORDER BY au.last_name, au.first_name, au.id",
            AUTHOR_COLUMNS,
            placeholders(ids.len())
        );
        self.grouped(&sql, ids, |row| Ok((row.get(0)?, map_author(row, 1)?)))
    }

    fn keywords_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<Keyword>>, AppError> {
        let sql = format!(
            "SELECT ak.article_id, k.id, k.name FROM article_keywords ak
             JOIN keywords k ON k.id = ak.keyword_id
             WHERE ak.article_id IN ({})
             ORDER BY k.name",
            placeholders(ids.len())
        );
        self.grouped(&sql, ids, |row| {
            Ok((
                row.get(0)?,
                Keyword {
                    id: row.get(1)?,
                    name: row.get(2)?,
                },
            ))
        })
    }

    fn translations_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<Translation>>, AppError> {
        let sql = format!(
            "SELECT article_id, language, title, abstract FROM article_translations
             WHERE article_id IN ({})
             ORDER BY CASE language WHEN 'uz' THEN 0 WHEN 'ru' THEN 1 ELSE 2 END",
            placeholders(ids.len())
        );
        self.grouped(&sql, ids, |row| {
            let code: String = row.get(1)?;
            let language = Language::parse(&code).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    Type::Text,
                    format!("unknown language code {}", code).into(),
                )
            })?;
            Ok((
                row.get(0)?,
                Translation {
                    language,
                    title: row.get(2)?,
                    abstract_text: row.get(3)?,
                },
            ))
        })
    }

    fn ensure_issue(conn: &Connection, issue_id: i64) -> Result<(), AppError> {
        let exists: Option<i64> = conn
            .query_row("SELECT id FROM issues WHERE id = ?1", params![issue_id], |r| r.get(0))
            .optional()?;
        exists
            .map(|_| ())
            .ok_or_else(|| AppError::field("issue", format!("Issue with ID {} does not exist", issue_id)))
    }

    /// Rejects identifiers that do not exist in the membership's target table.
    fn ensure_targets(conn: &Connection, m: &Membership, ids: &BTreeSet<i64>) -> Result<(), AppError> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "SELECT id FROM {} WHERE id IN ({})",
            m.target_table,
            placeholders(ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let found = stmt
            .query_map(params_from_iter(ids.iter()), |r| r.get::<_, i64>(0))?
            .collect::<Result<BTreeSet<i64>, _>>()?;
        let missing: Vec<String> = ids.difference(&found).map(|id| id.to_string()).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::field(
                m.field,
                format!("Unknown {} id(s): {}", m.field, missing.join(", ")),
            ))
        }
    }

    /// Makes the article's membership exactly `target`, touching only the difference.
    fn replace_membership(
        conn: &Connection,
        m: &Membership,
        article_id: i64,
        target: &[i64],
    ) -> Result<(), AppError> {
        let target: BTreeSet<i64> = target.iter().copied().collect();
        Self::ensure_targets(conn, m, &target)?;

        let current: BTreeSet<i64> = {
            let sql = format!(
                "SELECT {} FROM {} WHERE article_id = ?1",
                m.column, m.link_table
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![article_id], |r| r.get::<_, i64>(0))?;
            rows.collect::<Result<BTreeSet<i64>, _>>()?
        };

        let remove_sql = format!(
            "DELETE FROM {} WHERE article_id = ?1 AND {} = ?2",
            m.link_table, m.column
        );
        for id in current.difference(&target) {
            conn.execute(&remove_sql, params![article_id, id])?;
        }
        let add_sql = format!(
            "INSERT INTO {} (article_id, {}) VALUES (?1, ?2)",
            m.link_table, m.column
        );
        for id in target.difference(&current) {
            conn.execute(&add_sql, params![article_id, id])?;
        }
        Ok(())
    }

    /// Delete-all-then-recreate.
    fn replace_translations(
        conn: &Connection,
        article_id: i64,
        items: &[Translation],
    ) -> Result<(), AppError> {
        conn.execute(
            "DELETE FROM article_translations WHERE article_id = ?1",
            params![article_id],
        )?;
        for t in items {
            conn.execute(
                "INSERT INTO article_translations (article_id, language, title, abstract)
                 VALUES (?1, ?2, ?3, ?4)",
                params![article_id, t.language.to_string(), t.title, t.abstract_text],
            )?;
        }
        Ok(())
    }

    fn apply_relations(
        conn: &Connection,
        article_id: i64,
        relations: &ArticleRelations,
    ) -> Result<(), AppError> {
        if let Some(authors) = &relations.authors {
            Self::replace_membership(conn, &AUTHORS, article_id, authors)?;
        }
        if let Some(keywords) = &relations.keywords {
            Self::replace_membership(conn, &KEYWORDS, article_id, keywords)?;
        }
        if let TranslationsChange::Replace(items) = &relations.translations {
            Self::replace_translations(conn, article_id, items)?;
        }
        Ok(())
    }

    pub fn create(
        &self,
        draft: &ArticleDraft,
        relations: &ArticleRelations,
    ) -> Result<ArticleView, AppError> {
        let tx = begin_write(self.conn)?;
        Self::ensure_issue(&tx, draft.issue)?;
        tx.execute(
            "INSERT INTO articles (issue_id, doi, pages, references_text, article_file)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.issue,
                draft.doi,
                draft.pages,
                draft.references,
                draft.article_file,
            ],
        )?;
        let id = tx.last_insert_rowid();
        Self::apply_relations(&tx, id, relations)?;
        tx.commit()?;

        info!("Created article {} in issue {}", id, draft.issue);
        self.get_view(id)
    }

    /// Returns the updated article and the upload path it no longer references.
    pub fn update(
        &self,
        id: i64,
        draft: &ArticleDraft,
        relations: &ArticleRelations,
    ) -> Result<(ArticleView, Vec<String>), AppError> {
        let tx = begin_write(self.conn)?;
        let before = ArticleRepository::new(&tx).get(id)?;
        Self::ensure_issue(&tx, draft.issue)?;
        tx.execute(
            "UPDATE articles SET issue_id = ?1, doi = ?2, pages = ?3, references_text = ?4,
                                 article_file = ?5
             WHERE id = ?6",
            params![
                draft.issue,
                draft.doi,
                draft.pages,
                draft.references,
                draft.article_file,
                id,
            ],
        )?;
        Self::apply_relations(&tx, id, relations)?;
        tx.commit()?;

        let replaced = before
            .article_file
            .filter(|old| Some(old) != draft.article_file.as_ref())
            .into_iter()
            .collect();
        Ok((self.get_view(id)?, replaced))
    }

    /// Deletes the article with its translations; returns its upload path if any.
    pub fn delete(&self, id: i64) -> Result<Vec<String>, AppError> {
        let article = self.get(id)?;
        self.conn
            .execute("DELETE FROM articles WHERE id = ?1", params![id])?;
        info!("Deleted article {}", id);
        Ok(article.article_file.into_iter().collect())
    }

    pub fn increment_views(&self, id: i64) -> Result<i64, AppError> {
        self.conn
            .query_row(
                "UPDATE articles SET views = views + 1 WHERE id = ?1 RETURNING views",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("Article with ID {} not found", id)))
    }

    pub fn count(&self) -> Result<i64, AppError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?)
    }
}
