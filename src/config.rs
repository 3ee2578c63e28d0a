use crate::errors::AppError;
use std::path::PathBuf;

/// Journal type used when neither an issue nor its journal carries one.
pub const DEFAULT_JOURNAL_TYPE: &str = "QX";

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub upload_dir: PathBuf,
    pub session_secret: String,
    pub cookie_secure: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
            database_path: String::from("./data/journal_cms.db"),
            upload_dir: PathBuf::from("./data/uploads"),
            session_secret: String::new(),
            cookie_secure: false,
            admin_email: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    /// Reads settings from the process environment (`.env` is loaded by the caller).
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                AppError::ValidationError(format!("PORT must be a valid number, got {:?}", raw))
            })?,
            None => defaults.port,
        };

        let session_secret = lookup("SESSION_SECRET_KEY").ok_or_else(|| {
            AppError::ValidationError("SESSION_SECRET_KEY must be set".to_string())
        })?;
        // actix cookie keys need at least 64 bytes of material.
        if session_secret.len() < 64 {
            return Err(AppError::ValidationError(
                "SESSION_SECRET_KEY must be at least 64 characters long".to_string(),
            ));
        }

        let cookie_secure = lookup("COOKIE_SECURE")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(defaults.cookie_secure);

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            session_secret,
            cookie_secure,
            admin_email: lookup("ADMIN_EMAIL"),
            admin_password: lookup("ADMIN_PASSWORD"),
        })
    }
}
