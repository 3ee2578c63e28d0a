use crate::{
    db::{journal_repository::JournalRepository, Database},
    errors::AppError,
    models::{journal::JournalPayload, response::DeletedResponse},
    routes::auth::require_admin,
    utils::MediaStore,
};
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};
use log::info;
use validator::Validate;

#[get("/journals")]
pub async fn list_journals(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let journals = db.run(|conn| JournalRepository::new(conn).list()).await?;
    Ok(HttpResponse::Ok().json(journals))
}

#[get("/journals/{id}")]
pub async fn get_journal(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let journal = db.run(move |conn| JournalRepository::new(conn).get(id)).await?;
    Ok(HttpResponse::Ok().json(journal))
}

#[post("/journals")]
pub async fn create_journal(
    db: web::Data<Database>,
    session: Session,
    payload: web::Json<JournalPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let draft = payload.into_inner().into_draft(None);
    draft.validate()?;
    let journal = db
        .run(move |conn| JournalRepository::new(conn).create(&draft))
        .await?;
    info!("Created journal {} ({})", journal.id, journal.short_name);
    Ok(HttpResponse::Created().json(journal))
}

#[route("/journals/{id}", method = "PUT", method = "PATCH")]
pub async fn update_journal(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
    payload: web::Json<JournalPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let payload = payload.into_inner();
    let journal = db
        .run(move |conn| {
            let repo = JournalRepository::new(conn);
            let stored = repo.get(id)?;
            let draft = payload.into_draft(Some(&stored));
            draft.validate()?;
            repo.update(id, &draft)
        })
        .await?;
    Ok(HttpResponse::Ok().json(journal))
}

#[delete("/journals/{id}")]
pub async fn delete_journal(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let files = db
        .run(move |conn| JournalRepository::new(conn).delete(id))
        .await?;
    media.remove(&files).await;
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!("Journal {} deleted", id))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_journals)
        .service(get_journal)
        .service(create_journal)
        .service(update_journal)
        .service(delete_journal);
}
