use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Journal {
    pub id: i64,
    pub name: String,
    pub short_name: String,
}

/// Fully resolved journal fields, ready to be written.
#[derive(Debug, Validate)]
pub struct JournalDraft {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 10, message = "Short name must be 1-10 characters"))]
    pub short_name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct JournalPayload {
    pub name: Option<String>,
    pub short_name: Option<String>,
}

impl JournalPayload {
    /// Merges the payload over `base` (absent fields keep their stored value).
    pub fn into_draft(self, base: Option<&Journal>) -> JournalDraft {
        JournalDraft {
            name: self
                .name
                .or_else(|| base.map(|j| j.name.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            short_name: self
                .short_name
                .or_else(|| base.map(|j| j.short_name.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_update_keeps_stored_fields() {
        let stored = Journal {
            id: 1,
            name: "Qishloq xo'jaligi".into(),
            short_name: "QX".into(),
        };
        let draft = JournalPayload {
            name: Some("  Renamed ".into()),
            short_name: None,
        }
        .into_draft(Some(&stored));
        assert_eq!(draft.name, "Renamed");
        assert_eq!(draft.short_name, "QX");
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn missing_short_name_on_create_fails() {
        let draft = JournalPayload {
            name: Some("Journal".into()),
            short_name: None,
        }
        .into_draft(None);
        let errors = draft.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("short_name"));
    }
}
