use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RecentIssueLink {
    pub id: i64,
    pub title: String,
    pub link_to_issue: Option<i64>,
    pub order: i64,
}

#[derive(Debug, Validate)]
pub struct RecentIssueLinkDraft {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    pub link_to_issue: Option<i64>,
    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct RecentIssueLinkPayload {
    pub title: Option<String>,
    /// `null` clears the link, absence keeps it.
    #[serde(default, deserialize_with = "double_option")]
    pub link_to_issue: Option<Option<i64>>,
    pub order: Option<i64>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

impl RecentIssueLinkPayload {
    pub fn into_draft(self, base: Option<&RecentIssueLink>) -> RecentIssueLinkDraft {
        RecentIssueLinkDraft {
            title: self
                .title
                .or_else(|| base.map(|l| l.title.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            link_to_issue: match self.link_to_issue {
                Some(link) => link,
                None => base.and_then(|l| l.link_to_issue),
            },
            order: self.order.or_else(|| base.map(|l| l.order)).unwrap_or(0),
        }
    }
}
