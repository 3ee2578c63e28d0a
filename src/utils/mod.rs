use actix_multipart::{Field, Multipart};
use futures::{StreamExt, TryStreamExt};
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::errors::AppError;

pub mod security;

const MB: usize = 1024 * 1024;

/// Text form fields larger than this are rejected.
const MAX_TEXT_FIELD: usize = MB;

/// Where an upload goes and what it may contain.
#[derive(Debug)]
pub struct UploadRule {
    pub dir: &'static str,
    pub max_bytes: usize,
    pub content_types: &'static [&'static str],
    pub extensions: &'static [&'static str],
    pub description: &'static str,
}

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

impl UploadRule {
    pub const CONTACT_ATTACHMENT: UploadRule = UploadRule {
        dir: "contact_files",
        max_bytes: 20 * MB,
        content_types: &[
            "application/pdf",
            "application/msword",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ],
        extensions: &["pdf", "doc", "docx"],
        description: "PDF, DOC or DOCX",
    };

    pub const COVER_IMAGE: UploadRule = UploadRule {
        dir: "covers",
        max_bytes: 10 * MB,
        content_types: IMAGE_TYPES,
        extensions: IMAGE_EXTENSIONS,
        description: "JPEG, PNG, WEBP or GIF image",
    };

    pub const NEWS_IMAGE: UploadRule = UploadRule {
        dir: "news",
        max_bytes: 10 * MB,
        content_types: IMAGE_TYPES,
        extensions: IMAGE_EXTENSIONS,
        description: "JPEG, PNG, WEBP or GIF image",
    };

    pub const ISSUE_PDF: UploadRule = UploadRule {
        dir: "issues",
        max_bytes: 100 * MB,
        content_types: &["application/pdf"],
        extensions: &["pdf"],
        description: "PDF",
    };

    pub const ARTICLE_FILE: UploadRule = UploadRule {
        dir: "articles",
        max_bytes: 50 * MB,
        content_types: &["application/pdf"],
        extensions: &["pdf"],
        description: "PDF",
    };

    /// The extension must always be allowed; the declared type must be on the
    /// allow-list, generic, or missing.
    pub fn accepts(&self, content_type: Option<&str>, extension: &str) -> bool {
        if !self.extensions.contains(&extension) {
            return false;
        }
        match content_type {
            Some(ct) => self.content_types.contains(&ct) || ct == "application/octet-stream",
            None => true,
        }
    }
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Uploaded files on the local filesystem, addressed by paths relative to `root`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dir(&self) -> std::io::Result<()> {
        if !self.root.exists() {
            info!("Creating uploads directory {}", self.root.display());
            std::fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Streams `field` to disk under `rule.dir`, enforcing the rule as bytes arrive.
    /// Returns the stored relative path; nothing is left behind on failure.
    pub async fn save(&self, field: &mut Field, rule: &UploadRule) -> Result<String, AppError> {
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        let extension = extension_of(&filename);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        if !rule.accepts(content_type.as_deref(), &extension) {
            return Err(AppError::FileProcessingError(format!(
                "File must be a {}",
                rule.description
            )));
        }

        let relative = format!("{}/{}.{}", rule.dir, Uuid::new_v4(), extension);
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::StorageError(format!("Failed to create upload dir: {}", e))
            })?;
        }

        match Self::write_limited(field, &path, rule).await {
            Ok(()) => Ok(relative),
            Err(e) => {
                if let Err(rm) = fs::remove_file(&path).await {
                    warn!("Could not remove partial upload {}: {}", path.display(), rm);
                }
                Err(e)
            }
        }
    }

    async fn write_limited(field: &mut Field, path: &Path, rule: &UploadRule) -> Result<(), AppError> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            AppError::StorageError(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        let mut written = 0usize;
        while let Some(chunk) = field.next().await {
            let data = chunk
                .map_err(|e| AppError::FileProcessingError(format!("Chunk error: {}", e)))?;
            written += data.len();
            if written > rule.max_bytes {
                return Err(AppError::FileProcessingError(format!(
                    "File exceeds the {} MB limit",
                    rule.max_bytes / MB
                )));
            }
            file.write_all(&data).await.map_err(|e| {
                AppError::StorageError(format!("Failed to write {}: {}", path.display(), e))
            })?;
        }
        file.flush()
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to flush {}: {}", path.display(), e)))
    }

    /// Passes `result` through, removing `saved` uploads first when it failed.
    pub async fn discard_on_error<T>(
        &self,
        saved: &[String],
        result: Result<T, AppError>,
    ) -> Result<T, AppError> {
        if result.is_err() && !saved.is_empty() {
            self.remove(saved).await;
        }
        result
    }

    /// Best-effort removal of stored uploads; failures are logged.
    pub async fn remove(&self, paths: &[String]) {
        for relative in paths {
            let path = self.root.join(relative);
            match fs::remove_file(&path).await {
                Ok(()) => info!("Removed upload {}", relative),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove upload {}: {}", path.display(), e),
            }
        }
    }
}

/// Text values and stored uploads of a multipart request.
#[derive(Debug, Default)]
pub struct FormData {
    texts: HashMap<String, Vec<String>>,
    files: HashMap<String, String>,
}

impl FormData {
    /// Last value sent for `name`.
    pub fn text(&self, name: &str) -> Option<String> {
        self.texts.get(name).and_then(|v| v.last().cloned())
    }

    pub fn texts(&self, name: &str) -> Option<&[String]> {
        self.texts.get(name).map(Vec::as_slice)
    }

    pub fn file(&self, name: &str) -> Option<String> {
        self.files.get(name).cloned()
    }

    pub fn saved_files(&self) -> Vec<String> {
        self.files.values().cloned().collect()
    }

    /// Parses the last value of `name` as `T`; blank counts as absent.
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, AppError> {
        match self.text(name).map(|v| v.trim().to_string()) {
            None => Ok(None),
            Some(v) if v.is_empty() => Ok(None),
            Some(v) => v
                .parse::<T>()
                .map(Some)
                .map_err(|_| AppError::field(name, format!("Invalid value '{}'", v))),
        }
    }
}

async fn read_text(field: &mut Field) -> Result<String, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let data =
            chunk.map_err(|e| AppError::FileProcessingError(format!("Chunk error: {}", e)))?;
        if bytes.len() + data.len() > MAX_TEXT_FIELD {
            return Err(AppError::ValidationError("Form field too large".to_string()));
        }
        bytes.extend_from_slice(&data);
    }
    String::from_utf8(bytes)
        .map_err(|e| AppError::ValidationError(format!("Invalid UTF-8: {}", e)))
}

/// Reads the whole form, storing file fields named in `rules`.
/// On any failure every file already stored for this request is removed.
pub async fn collect_form(
    mut payload: Multipart,
    store: &MediaStore,
    rules: &[(&str, &UploadRule)],
) -> Result<FormData, AppError> {
    let mut form = FormData::default();
    match read_fields(&mut payload, store, rules, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            store.remove(&form.saved_files()).await;
            Err(e)
        }
    }
}

async fn read_fields(
    payload: &mut Multipart,
    store: &MediaStore,
    rules: &[(&str, &UploadRule)],
    form: &mut FormData,
) -> Result<(), AppError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::FileProcessingError(format!("Malformed multipart body: {}", e)))?
    {
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .ok_or_else(|| AppError::ValidationError("Field name not found".to_string()))?
            .to_string();
        let has_filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .is_some_and(|f| !f.is_empty());

        match rules.iter().find(|(field_name, _)| *field_name == name) {
            Some((_, rule)) if has_filename => {
                let stored = store.save(&mut field, rule).await?;
                if let Some(previous) = form.files.insert(name, stored) {
                    store.remove(&[previous]).await;
                }
            }
            // An empty file input carries no filename; treat it as absent.
            Some(_) => while field.next().await.is_some() {},
            None => {
                let value = read_text(&mut field).await?;
                form.texts.entry(name).or_default().push(value);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_rule_checks_type_and_extension() {
        let rule = UploadRule::CONTACT_ATTACHMENT;
        assert!(rule.accepts(Some("application/pdf"), "pdf"));
        assert!(rule.accepts(Some("application/msword"), "doc"));
        assert!(rule.accepts(Some("application/octet-stream"), "docx"));
        assert!(rule.accepts(None, "pdf"));
        assert!(!rule.accepts(Some("image/png"), "png"));
        assert!(!rule.accepts(Some("application/octet-stream"), "exe"));
    }

    #[test]
    fn allowed_type_does_not_excuse_a_foreign_extension() {
        let rule = UploadRule::CONTACT_ATTACHMENT;
        assert!(!rule.accepts(Some("application/pdf"), "html"));
        assert!(!rule.accepts(Some("application/pdf"), ""));
        assert!(!UploadRule::NEWS_IMAGE.accepts(Some("image/png"), "svg"));
    }

    #[test]
    fn extensions_are_lowercased() {
        assert_eq!(extension_of("Paper.PDF"), "pdf");
        assert_eq!(extension_of("noext"), "");
    }

    #[test]
    fn form_parse_reports_field() {
        let mut form = FormData::default();
        form.texts.insert("issue".into(), vec!["abc".into()]);
        form.texts.insert("blank".into(), vec!["  ".into()]);
        match form.parse::<i64>("issue").unwrap_err() {
            AppError::InvalidFields(fields) => assert_eq!(fields[0].field, "issue"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(form.parse::<i64>("blank").unwrap(), None);
        assert_eq!(form.parse::<i64>("missing").unwrap(), None);
    }

    #[actix_web::test]
    async fn removing_missing_files_is_quiet() {
        let store = MediaStore::new(std::env::temp_dir().join("journal-cms-none"));
        store.remove(&["nope/missing.pdf".to_string()]).await;
    }
}
