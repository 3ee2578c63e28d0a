use crate::models::media_url;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ContactMessageFile {
    pub id: i64,
    pub message: i64,
    pub file: String,
    pub url: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl ContactMessageFile {
    pub fn new(id: i64, message: i64, file: String, uploaded_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id,
            message,
            url: media_url(&Some(file.clone())),
            file,
            uploaded_at,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub files: Vec<ContactMessageFile>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactMessagePayload {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "Subject cannot be empty"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,
}

impl ContactMessagePayload {
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContactStatusPayload {
    pub is_read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_payload_requires_valid_email() {
        let payload = ContactMessagePayload {
            name: "Dilnoza".into(),
            email: "not-an-email".into(),
            subject: "Submission".into(),
            message: "Hello".into(),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn whitespace_only_fields_fail_after_trim() {
        let payload = ContactMessagePayload {
            name: "   ".into(),
            email: "a@b.uz".into(),
            subject: "Hi".into(),
            message: "Body".into(),
        }
        .trimmed();
        assert!(payload.validate().is_err());
    }
}
