use serde::Serialize;

#[derive(Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

impl DeletedResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationResponse {
    pub field: String,
    pub message: String,
}

impl ValidationResponse {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Flattens derive-level validation errors into one entry per failed rule,
    /// sorted by field so responses are stable.
    pub fn from_validator(errors: &validator::ValidationErrors) -> Vec<ValidationResponse> {
        let mut out: Vec<ValidationResponse> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| ValidationResponse {
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        out.sort_by(|a, b| a.field.cmp(&b.field));
        out
    }
}

/// Collects per-field failures and turns them into a single result.
pub fn finish_validation(errors: Vec<ValidationResponse>) -> Result<(), Vec<ValidationResponse>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
