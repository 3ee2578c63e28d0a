use crate::models::response::ValidationResponse;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    DatabaseError(String),
    StorageError(String),
    ValidationError(String),
    InvalidFields(Vec<ValidationResponse>),
    FileProcessingError(String),
    NotFound(String),
    Unauthorized(String),
    PermissionDenied(String),
    HashingError(String),
    InternalError(String),
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::InvalidFields(fields) => {
                let joined = fields
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<String>>()
                    .join("; ");
                write!(f, "Validation error: {}", joined)
            }
            AppError::FileProcessingError(msg) => write!(f, "File processing error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized error: {}", msg),
            AppError::PermissionDenied(msg) => write!(f, "Permission error: {}", msg),
            AppError::HashingError(msg) => write!(f, "Hashing error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict error: {}", msg),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<ValidationResponse>>,
}

impl std::error::Error for AppError {}

impl AppError {
    /// Shorthand for a single field-scoped validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::InvalidFields(vec![ValidationResponse {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::StorageError(_) => "STORAGE_ERROR",
            AppError::ValidationError(_) | AppError::InvalidFields(_) => "VALIDATION_ERROR",
            AppError::FileProcessingError(_) => "FILE_PROCESSING_ERROR",
            AppError::NotFound(_) => "NOT_FOUND_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED_ERROR",
            AppError::PermissionDenied(_) => "PERMISSION_ERROR",
            AppError::HashingError(_) => "HASHING_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
            AppError::Conflict(_) => "CONFLICT_ERROR",
        }
    }
}

impl From<Vec<ValidationResponse>> for AppError {
    fn from(errors: Vec<ValidationResponse>) -> Self {
        AppError::InvalidFields(errors)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidFields(ValidationResponse::from_validator(&errors))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::NotFound("Requested record does not exist".to_string())
            }
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::InternalError(format!("Blocking error: {}", err))
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (message, fields) = match self {
            AppError::InvalidFields(fields) => (
                "One or more fields are invalid".to_string(),
                Some(fields.clone()),
            ),
            AppError::DatabaseError(msg)
            | AppError::StorageError(msg)
            | AppError::ValidationError(msg)
            | AppError::FileProcessingError(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::PermissionDenied(msg)
            | AppError::HashingError(msg)
            | AppError::InternalError(msg)
            | AppError::Conflict(msg) => (msg.to_string(), None),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.code().to_string(),
            message,
            fields,
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::FileProcessingError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::HashingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // A second current issue is a client mistake, not a resource clash.
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
        }
    }
}
