//! Request-level filter parameters and their translation into SQL.

use crate::db::like_pattern;
use crate::models::non_blank;
use rusqlite::types::Value;
use serde::Deserialize;

/// `true`, `1`, `yes` and `ha` (Uzbek "yes") are truthy; anything else is false.
pub fn parse_loose_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "ha"
    )
}

/// WHERE clauses and their bound values, built up one condition at a time.
#[derive(Debug, Default)]
pub struct SqlFilter {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl SqlFilter {
    pub fn push(&mut self, clause: &str, values: Vec<Value>) {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct IssueQuery {
    pub journal: Option<String>,
    pub current: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct IssueFilter {
    pub journal: Option<String>,
    pub current: Option<bool>,
    pub search: Option<String>,
}

impl From<IssueQuery> for IssueFilter {
    fn from(query: IssueQuery) -> Self {
        Self {
            journal: non_blank(query.journal),
            current: non_blank(query.current).map(|c| parse_loose_bool(&c)),
            search: non_blank(query.search),
        }
    }
}

impl IssueFilter {
    /// Expects issues aliased `i` joined to journals aliased `j`.
    pub fn to_sql(&self) -> SqlFilter {
        let mut sql = SqlFilter::default();
        if let Some(journal) = &self.journal {
            sql.push("j.short_name = ?", vec![Value::Text(journal.clone())]);
        }
        if let Some(current) = self.current {
            sql.push("i.is_current = ?", vec![Value::Integer(current as i64)]);
        }
        if let Some(search) = &self.search {
            sql.push("LOWER(i.title) LIKE ?", vec![Value::Text(like_pattern(search))]);
        }
        sql
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ArticleQuery {
    pub issue: Option<String>,
    pub journal: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArticleFilter {
    pub issue: Option<i64>,
    pub journal: Option<String>,
    pub search: Option<String>,
}

impl ArticleQuery {
    /// Fails with the offending parameter when `issue` is not an identifier.
    pub fn into_filter(self) -> Result<ArticleFilter, &'static str> {
        let issue = match non_blank(self.issue) {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| "issue")?),
            None => None,
        };
        Ok(ArticleFilter {
            issue,
            journal: non_blank(self.journal),
            search: non_blank(self.search),
        })
    }
}

impl ArticleFilter {
    /// Expects articles aliased `a`.
    pub fn to_sql(&self) -> SqlFilter {
        let mut sql = SqlFilter::default();
        if let Some(issue) = self.issue {
            sql.push("a.issue_id = ?", vec![Value::Integer(issue)]);
        }
        if let Some(journal) = &self.journal {
            sql.push(
                "a.issue_id IN (SELECT i.id FROM issues i JOIN journals j ON j.id = i.journal_id
                                WHERE j.short_name = ?)",
                vec![Value::Text(journal.clone())],
            );
        }
        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            sql.push(
                "(LOWER(COALESCE(a.doi, '')) LIKE ? OR a.id IN
                    (SELECT t.article_id FROM article_translations t WHERE LOWER(t.title) LIKE ?))",
                vec![Value::Text(pattern.clone()), Value::Text(pattern)],
            );
        }
        sql
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct BoardQuery {
    pub journal: Option<String>,
    pub role: Option<String>,
}

impl BoardQuery {
    /// Expects board members aliased `m` joined to journals aliased `j`.
    pub fn to_sql(&self) -> SqlFilter {
        let mut sql = SqlFilter::default();
        if let Some(journal) = non_blank(self.journal.clone()) {
            sql.push("j.short_name = ?", vec![Value::Text(journal)]);
        }
        if let Some(role) = non_blank(self.role.clone()) {
            sql.push("m.role = ?", vec![Value::Text(role)]);
        }
        sql
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    pub search: Option<String>,
}

impl SearchQuery {
    /// Case-insensitive substring match over any of `columns`.
    pub fn to_sql(&self, columns: &[&str]) -> SqlFilter {
        let mut sql = SqlFilter::default();
        if let Some(search) = non_blank(self.search.clone()) {
            let pattern = like_pattern(&search);
            let clause = columns
                .iter()
                .map(|c| format!("LOWER(COALESCE({}, '')) LIKE ?", c))
                .collect::<Vec<String>>()
                .join(" OR ");
            sql.push(
                &format!("({})", clause),
                columns.iter().map(|_| Value::Text(pattern.clone())).collect(),
            );
        }
        sql
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ContactQuery {
    pub search: Option<String>,
    pub is_read: Option<String>,
}

impl ContactQuery {
    pub fn to_sql(&self) -> SqlFilter {
        let mut sql = SearchQuery {
            search: self.search.clone(),
        }
        .to_sql(&["name", "email", "subject", "message"]);
        if let Some(read) = non_blank(self.is_read.clone()) {
            sql.push(
                "is_read = ?",
                vec![Value::Integer(parse_loose_bool(&read) as i64)],
            );
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_bool_accepts_known_truthy_words() {
        for raw in ["true", "TRUE", "1", "yes", "Ha", " ha "] {
            assert!(parse_loose_bool(raw), "{raw} should be truthy");
        }
        for raw in ["false", "0", "no", "yoq", "maybe"] {
            assert!(!parse_loose_bool(raw), "{raw} should be falsy");
        }
    }

    #[test]
    fn absent_or_blank_current_means_no_filter() {
        let filter = IssueFilter::from(IssueQuery {
            current: Some("".into()),
            ..Default::default()
        });
        assert_eq!(filter.current, None);
        assert_eq!(filter.to_sql().where_sql(), "");
    }

    #[test]
    fn issue_filter_combines_conditions() {
        let filter = IssueFilter::from(IssueQuery {
            journal: Some("qx".into()),
            current: Some("ha".into()),
            search: None,
        });
        let sql = filter.to_sql();
        assert_eq!(sql.where_sql(), "WHERE j.short_name = ? AND i.is_current = ?");
        assert_eq!(
            sql.values(),
            &[Value::Text("qx".into()), Value::Integer(1)]
        );
    }

    #[test]
    fn non_numeric_issue_parameter_is_rejected() {
        let err = ArticleQuery {
            issue: Some("abc".into()),
            ..Default::default()
        }
        .into_filter()
        .unwrap_err();
        assert_eq!(err, "issue");
    }

    #[test]
    fn search_spans_all_columns() {
        let sql = SearchQuery {
            search: Some("Soil".into()),
        }
        .to_sql(&["title", "content"]);
        assert_eq!(sql.values().len(), 2);
        assert_eq!(sql.values()[0], Value::Text("%soil%".into()));
    }
}
