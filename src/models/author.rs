use crate::models::non_blank;
use crate::models::response::{finish_validation, ValidationResponse};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

static ORCID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}[0-9X]$").expect("valid ORCID regex"));

pub fn is_valid_orcid(orcid: &str) -> bool {
    ORCID_RE.is_match(orcid)
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Author {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub orcid_id: Option<String>,
    pub organization: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Validate)]
pub struct AuthorDraft {
    #[validate(length(min = 1, max = 100, message = "Last name cannot be empty"))]
    pub last_name: String,
    #[validate(length(min = 1, max = 100, message = "First name cannot be empty"))]
    pub first_name: String,
    pub patronymic: Option<String>,
    pub orcid_id: Option<String>,
    pub organization: Option<String>,
    pub position: Option<String>,
}

impl AuthorDraft {
    pub fn validate_author(&self) -> Result<(), Vec<ValidationResponse>> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => ValidationResponse::from_validator(&e),
        };

        if let Some(orcid) = &self.orcid_id {
            if !is_valid_orcid(orcid) {
                errors.push(ValidationResponse::new(
                    "orcid_id",
                    "ORCID must look like 0000-0000-0000-000X",
                ));
            }
        }

        finish_validation(errors)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AuthorPayload {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub patronymic: Option<String>,
    pub orcid_id: Option<String>,
    pub organization: Option<String>,
    pub position: Option<String>,
}

impl AuthorPayload {
    pub fn into_draft(self, base: Option<&Author>) -> AuthorDraft {
        let keep = |new: Option<String>, old: Option<&Option<String>>| match new {
            Some(v) => non_blank(Some(v)),
            None => old.cloned().flatten(),
        };

        AuthorDraft {
            last_name: self
                .last_name
                .or_else(|| base.map(|a| a.last_name.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            first_name: self
                .first_name
                .or_else(|| base.map(|a| a.first_name.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            patronymic: keep(self.patronymic, base.map(|a| &a.patronymic)),
            orcid_id: keep(self.orcid_id, base.map(|a| &a.orcid_id)),
            organization: keep(self.organization, base.map(|a| &a.organization)),
            position: keep(self.position, base.map(|a| &a.position)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Keyword {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordPayload {
    pub name: Option<String>,
}

impl KeywordPayload {
    /// Trimmed keyword name, rejected when nothing is left.
    pub fn into_name(self) -> Result<String, Vec<ValidationResponse>> {
        match non_blank(self.name) {
            Some(name) if name.chars().count() <= 100 => Ok(name),
            Some(_) => Err(vec![ValidationResponse::new(
                "name",
                "Keyword must be at most 100 characters",
            )]),
            None => Err(vec![ValidationResponse::new(
                "name",
                "Keyword cannot be empty",
            )]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(orcid: Option<&str>) -> AuthorDraft {
        AuthorPayload {
            last_name: Some("Karimov".into()),
            first_name: Some("Aziz".into()),
            orcid_id: orcid.map(String::from),
            ..Default::default()
        }
        .into_draft(None)
    }

    #[test]
    fn orcid_pattern() {
        assert!(is_valid_orcid("0000-0002-1495-3967"));
        assert!(is_valid_orcid("0000-0002-1694-233X"));
        assert!(!is_valid_orcid("123-456"));
        assert!(!is_valid_orcid("0000-0002-1495-396x"));
        // Non-ASCII decimal digits are not ORCID digits.
        assert!(!is_valid_orcid("٠٠٠٠-٠٠٠٢-١٤٩٥-٣٩٦٧"));
        assert!(!is_valid_orcid("０000-0002-1495-3967"));
    }

    #[test]
    fn valid_orcid_passes_validation() {
        assert!(draft(Some("0000-0002-1495-3967")).validate_author().is_ok());
    }

    #[test]
    fn bad_orcid_is_a_field_error() {
        let errors = draft(Some("123-456")).validate_author().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "orcid_id");
    }

    #[test]
    fn blank_orcid_is_treated_as_absent() {
        let d = draft(Some("   "));
        assert!(d.orcid_id.is_none());
        assert!(d.validate_author().is_ok());
    }

    #[test]
    fn names_are_required() {
        let errors = AuthorPayload {
            last_name: Some("  ".into()),
            ..Default::default()
        }
        .into_draft(None)
        .validate_author()
        .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["first_name", "last_name"]);
    }

    #[test]
    fn keyword_names_are_trimmed() {
        let name = KeywordPayload {
            name: Some("  soil ".into()),
        }
        .into_name()
        .unwrap();
        assert_eq!(name, "soil");
        assert!(KeywordPayload {
            name: Some("   ".into())
        }
        .into_name()
        .is_err());
    }
}
