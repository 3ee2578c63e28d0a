pub mod admin;
pub mod article;
pub mod author;
pub mod board;
pub mod contact;
pub mod issue;
pub mod journal;
pub mod news;
pub mod recent_issue;
pub mod response;

/// Public URL of a stored upload, as served by the `/media` file service.
pub fn media_url(path: &Option<String>) -> Option<String> {
    path.as_ref()
        .filter(|p| !p.is_empty())
        .map(|p| format!("/media/{}", p))
}

/// Treats a blank string as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
