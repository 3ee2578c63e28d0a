use crate::models::author::{Author, Keyword};
use crate::models::media_url;
use derive_more::Display;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[display("uz")]
    Uz,
    #[display("ru")]
    Ru,
    #[display("en")]
    En,
}

impl Language {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "uz" => Some(Self::Uz),
            "ru" => Some(Self::Ru),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub language: Language,
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub issue_id: i64,
    pub doi: Option<String>,
    pub pages: String,
    pub references: Option<String>,
    pub article_file: Option<String>,
    pub views: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ArticleView {
    pub id: i64,
    pub issue: i64,
    pub doi: Option<String>,
    pub pages: String,
    pub authors: Vec<Author>,
    pub keywords: Vec<Keyword>,
    pub translations: Vec<Translation>,
    pub references: Option<String>,
    pub views: i64,
    pub article_file: Option<String>,
}

impl ArticleView {
    pub fn new(
        article: Article,
        authors: Vec<Author>,
        keywords: Vec<Keyword>,
        translations: Vec<Translation>,
    ) -> Self {
        Self {
            id: article.id,
            issue: article.issue_id,
            article_file: media_url(&article.article_file),
            doi: article.doi,
            pages: article.pages,
            authors,
            keywords,
            translations,
            references: article.references,
            views: article.views,
        }
    }
}

/// What an article write does to the stored translation set.
#[derive(Debug, PartialEq)]
pub enum TranslationsChange {
    Keep,
    Replace(Vec<Translation>),
}

/// Parses a `translations_payload` batch.
///
/// A batch is malformed when it is not a JSON array of
/// `{language, title, abstract}` objects, names a language outside
/// uz/ru/en, or repeats a language.
pub fn parse_translations(raw: &str) -> Option<Vec<Translation>> {
    let items: Vec<Translation> = serde_json::from_str(raw).ok()?;
    let mut seen = HashSet::new();
    if items.iter().all(|t| seen.insert(t.language)) {
        Some(items)
    } else {
        None
    }
}

/// On create a missing or malformed batch yields no translations.
pub fn translations_for_create(raw: Option<&str>) -> Vec<Translation> {
    match raw {
        None => Vec::new(),
        Some(raw) => parse_translations(raw).unwrap_or_else(|| {
            warn!("Ignoring malformed translations_payload on article create");
            Vec::new()
        }),
    }
}

/// On update a missing or malformed batch leaves the stored set untouched.
pub fn translations_for_update(raw: Option<&str>) -> TranslationsChange {
    match raw.map(parse_translations) {
        None => TranslationsChange::Keep,
        Some(Some(items)) => TranslationsChange::Replace(items),
        Some(None) => {
            warn!("Ignoring malformed translations_payload on article update");
            TranslationsChange::Keep
        }
    }
}

/// Article fields collected from a multipart form.
#[derive(Debug, Default, Clone)]
pub struct ArticleWrite {
    pub issue: Option<i64>,
    pub doi: Option<String>,
    pub pages: Option<String>,
    pub references: Option<String>,
    pub authors: Option<Vec<i64>>,
    pub keywords: Option<Vec<i64>>,
    pub translations_payload: Option<String>,
    pub article_file: Option<String>,
}

#[derive(Debug, Validate)]
pub struct ArticleDraft {
    pub issue: i64,
    #[validate(length(max = 100, message = "DOI must be at most 100 characters"))]
    pub doi: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Pages must be 1-50 characters"))]
    pub pages: String,
    pub references: Option<String>,
    pub article_file: Option<String>,
}

impl ArticleWrite {
    /// Scalar fields merged over `base`; memberships and translations are
    /// handled separately because they are not stored on the article row.
    pub fn draft(&self, base: Option<&Article>) -> Result<ArticleDraft, &'static str> {
        let issue = self
            .issue
            .or_else(|| base.map(|a| a.issue_id))
            .ok_or("issue")?;

        let optional = |new: &Option<String>, old: Option<&Option<String>>| match new {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => old.cloned().flatten(),
        };

        Ok(ArticleDraft {
            issue,
            doi: optional(&self.doi, base.map(|a| &a.doi)),
            pages: self
                .pages
                .clone()
                .or_else(|| base.map(|a| a.pages.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            references: optional(&self.references, base.map(|a| &a.references)),
            article_file: self
                .article_file
                .clone()
                .or_else(|| base.and_then(|a| a.article_file.clone())),
        })
    }
}
