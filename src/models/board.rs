use derive_more::Display;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum BoardRole {
    #[serde(rename = "bosh_muharrir")]
    #[display("bosh_muharrir")]
    ChiefEditor,
    #[serde(rename = "masul_kotib")]
    #[display("masul_kotib")]
    ExecutiveSecretary,
    #[serde(rename = "hayat_azosi")]
    #[display("hayat_azosi")]
    Member,
}

impl BoardRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "bosh_muharrir" => Some(Self::ChiefEditor),
            "masul_kotib" => Some(Self::ExecutiveSecretary),
            "hayat_azosi" => Some(Self::Member),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ChiefEditor => "Bosh muharrir",
            Self::ExecutiveSecretary => "Mas'ul kotib",
            Self::Member => "Hay'at a'zosi",
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BoardMember {
    pub id: i64,
    pub journal: i64,
    pub full_name: String,
    pub position_description: String,
    pub role: BoardRole,
    pub role_display: &'static str,
    pub order: i64,
}

#[derive(Debug, Validate)]
pub struct BoardMemberDraft {
    pub journal: i64,
    #[validate(length(min = 1, max = 255, message = "Full name cannot be empty"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "Position description cannot be empty"))]
    pub position_description: String,
    pub role: BoardRole,
    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct BoardMemberPayload {
    pub journal: Option<i64>,
    pub full_name: Option<String>,
    pub position_description: Option<String>,
    pub role: Option<BoardRole>,
    pub order: Option<i64>,
}

impl BoardMemberPayload {
    /// Fails with the name of a required field that is missing on create.
    pub fn into_draft(self, base: Option<&BoardMember>) -> Result<BoardMemberDraft, &'static str> {
        let journal = self
            .journal
            .or_else(|| base.map(|m| m.journal))
            .ok_or("journal")?;
        let role = self.role.or_else(|| base.map(|m| m.role)).ok_or("role")?;

        Ok(BoardMemberDraft {
            journal,
            full_name: self
                .full_name
                .or_else(|| base.map(|m| m.full_name.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            position_description: self
                .position_description
                .or_else(|| base.map(|m| m.position_description.clone()))
                .unwrap_or_default()
                .trim()
                .to_string(),
            role,
            order: self.order.or_else(|| base.map(|m| m.order)).unwrap_or(0),
        })
    }
}
