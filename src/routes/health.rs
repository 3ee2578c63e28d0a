use crate::{
    db::{
        article_repository::ArticleRepository, contact_repository::ContactRepository,
        issue_repository::IssueRepository, journal_repository::JournalRepository, Database,
    },
    errors::AppError,
};
use actix_web::{get, web, HttpResponse};
use log::error;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Counts {
    pub journals: i64,
    pub issues: i64,
    pub articles: i64,
    pub unread_messages: i64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Counts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

async fn probe(db: &Database) -> Result<Counts, AppError> {
    db.run(|conn| {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(Counts {
            journals: JournalRepository::new(conn).count()?,
            issues: IssueRepository::new(conn).count()?,
            articles: ArticleRepository::new(conn).count()?,
            unread_messages: ContactRepository::new(conn).count_unread()?,
        })
    })
    .await
}

/// Always answers; a store failure turns into 503 instead of an error body.
#[get("/health")]
pub async fn health(db: web::Data<Database>) -> HttpResponse {
    match probe(&db).await {
        Ok(counts) => HttpResponse::Ok().json(HealthResponse {
            status: "ok",
            counts: Some(counts),
            message: None,
        }),
        Err(e) => {
            error!("Health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "unavailable",
                counts: None,
                message: Some(e.to_string()),
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
