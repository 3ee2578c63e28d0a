use crate::config::DEFAULT_JOURNAL_TYPE;
use crate::models::article::ArticleView;
use crate::models::media_url;
use chrono::NaiveDate;
use serde::Serialize;
use validator::Validate;

/// An issue row joined with the name and short code of its journal.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: i64,
    pub journal_id: i64,
    pub journal_type: Option<String>,
    pub title: String,
    pub cover_image: Option<String>,
    pub pdf_file: Option<String>,
    pub published_date: NaiveDate,
    pub is_current: bool,
    pub journal_name: String,
    pub journal_short_name: Option<String>,
}

impl Issue {
    /// Stored type, else the journal's short code, else the site default.
    pub fn effective_journal_type(&self) -> String {
        [self.journal_type.as_deref(), self.journal_short_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|code| !code.is_empty())
            .unwrap_or(DEFAULT_JOURNAL_TYPE)
            .to_string()
    }

    pub fn stored_files(&self) -> Vec<String> {
        [self.cover_image.clone(), self.pdf_file.clone()]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct IssueView {
    pub id: i64,
    pub journal: i64,
    pub journal_name: String,
    pub journal_type: String,
    pub title: String,
    pub cover_image: Option<String>,
    pub pdf_file: Option<String>,
    pub published_date: NaiveDate,
    pub is_current: bool,
    pub articles: Vec<ArticleView>,
}

impl IssueView {
    pub fn new(issue: Issue, articles: Vec<ArticleView>) -> Self {
        Self {
            id: issue.id,
            journal: issue.journal_id,
            journal_type: issue.effective_journal_type(),
            cover_image: media_url(&issue.cover_image),
            pdf_file: media_url(&issue.pdf_file),
            journal_name: issue.journal_name,
            title: issue.title,
            published_date: issue.published_date,
            is_current: issue.is_current,
            articles,
        }
    }
}

/// Issue fields collected from a multipart form. Files are stored upload paths.
#[derive(Debug, Default, Clone)]
pub struct IssueWrite {
    pub journal: Option<i64>,
    pub journal_type: Option<String>,
    pub title: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub is_current: Option<bool>,
    pub cover_image: Option<String>,
    pub pdf_file: Option<String>,
}

#[derive(Debug, Validate)]
pub struct IssueDraft {
    pub journal: i64,
    /// Explicit type from the request; resolved against the journal on write.
    pub journal_type: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    pub published_date: NaiveDate,
    pub is_current: bool,
    pub cover_image: Option<String>,
    pub pdf_file: Option<String>,
}

impl IssueWrite {
    /// Merges over `base`; fails with the name of a required field missing on create.
    pub fn into_draft(self, base: Option<&Issue>) -> Result<IssueDraft, &'static str> {
        let journal = self
            .journal
            .or_else(|| base.map(|i| i.journal_id))
            .ok_or("journal")?;
        let published_date = self
            .published_date
            .or_else(|| base.map(|i| i.published_date))
            .ok_or("published_date")?;

        // A stored type only carries over while the issue stays in the same journal.
        let journal_type = match self.journal_type {
            Some(explicit) => Some(explicit),
            None => base
                .filter(|i| i.journal_id == journal)
                .and_then(|i| i.journal_type.clone()),
        };

        Ok(IssueDraft {
            journal,
            journal_type,
            title: self
                .title
                .or_else(|| base.map(|i| i.title.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            published_date,
            is_current: self
                .is_current
                .or_else(|| base.map(|i| i.is_current))
                .unwrap_or(false),
            cover_image: self
                .cover_image
                .or_else(|| base.and_then(|i| i.cover_image.clone())),
            pdf_file: self
                .pdf_file
                .or_else(|| base.and_then(|i| i.pdf_file.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(journal_type: Option<&str>, short: Option<&str>) -> Issue {
        Issue {
            id: 1,
            journal_id: 1,
            journal_type: journal_type.map(String::from),
            title: "7-son, 2025".into(),
            cover_image: None,
            pdf_file: None,
            published_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            is_current: false,
            journal_name: "Journal".into(),
            journal_short_name: short.map(String::from),
        }
    }

    #[test]
    fn journal_type_prefers_stored_value() {
        assert_eq!(issue(Some("AI"), Some("QX")).effective_journal_type(), "AI");
    }

    #[test]
    fn journal_type_falls_back_to_journal_code() {
        assert_eq!(issue(None, Some("AI")).effective_journal_type(), "AI");
        assert_eq!(issue(Some("  "), Some("AI")).effective_journal_type(), "AI");
    }

    #[test]
    fn journal_type_falls_back_to_default() {
        assert_eq!(issue(None, None).effective_journal_type(), DEFAULT_JOURNAL_TYPE);
        assert_eq!(issue(None, Some("")).effective_journal_type(), DEFAULT_JOURNAL_TYPE);
    }

    #[test]
    fn moving_journal_drops_stored_type() {
        let base = issue(Some("QX"), Some("QX"));
        let draft = IssueWrite {
            journal: Some(2),
            ..Default::default()
        }
        .into_draft(Some(&base))
        .unwrap();
        assert_eq!(draft.journal_type, None);

        let draft = IssueWrite::default().into_draft(Some(&base)).unwrap();
        assert_eq!(draft.journal_type.as_deref(), Some("QX"));
    }

    #[test]
    fn create_requires_journal_and_date() {
        assert_eq!(IssueWrite::default().into_draft(None).unwrap_err(), "journal");
        let err = IssueWrite {
            journal: Some(1),
            ..Default::default()
        }
        .into_draft(None)
        .unwrap_err();
        assert_eq!(err, "published_date");
    }
}
