use crate::models::media_url;
use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

#[derive(Debug, Clone, PartialEq)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct NewsView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<News> for NewsView {
    fn from(news: News) -> Self {
        Self {
            id: news.id,
            image: media_url(&news.image),
            title: news.title,
            content: news.content,
            created_at: news.created_at,
        }
    }
}

#[derive(Debug, Validate)]
pub struct NewsDraft {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: String,
    pub image: Option<String>,
}

/// News fields collected from a multipart form; `image` is a stored upload path.
#[derive(Debug, Default)]
pub struct NewsWrite {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
}

impl NewsWrite {
    pub fn into_draft(self, base: Option<&News>) -> NewsDraft {
        NewsDraft {
            title: self
                .title
                .or_else(|| base.map(|n| n.title.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            content: self
                .content
                .or_else(|| base.map(|n| n.content.clone()))
                .unwrap_or_default(),
            image: self.image.or_else(|| base.and_then(|n| n.image.clone())),
        }
    }
}
