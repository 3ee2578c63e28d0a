use crate::{
    db::{author_repository::AuthorRepository, filters::SearchQuery, Database},
    errors::AppError,
    models::{author::AuthorPayload, response::DeletedResponse},
    routes::auth::require_admin,
};
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};

#[get("/authors")]
pub async fn list_authors(
    db: web::Data<Database>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let authors = db
        .run(move |conn| AuthorRepository::new(conn).list(&query))
        .await?;
    Ok(HttpResponse::Ok().json(authors))
}

#[get("/authors/{id}")]
pub async fn get_author(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let author = db.run(move |conn| AuthorRepository::new(conn).get(id)).await?;
    Ok(HttpResponse::Ok().json(author))
}

#[post("/authors")]
pub async fn create_author(
    db: web::Data<Database>,
    session: Session,
    payload: web::Json<AuthorPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let draft = payload.into_inner().into_draft(None);
    draft.validate_author()?;
    let author = db
        .run(move |conn| AuthorRepository::new(conn).create(&draft))
        .await?;
    Ok(HttpResponse::Created().json(author))
}

#[route("/authors/{id}", method = "PUT", method = "PATCH")]
pub async fn update_author(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
    payload: web::Json<AuthorPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let payload = payload.into_inner();
    let author = db
        .run(move |conn| {
            let repo = AuthorRepository::new(conn);
            let stored = repo.get(id)?;
            let draft = payload.into_draft(Some(&stored));
            draft.validate_author()?;
            repo.update(id, &draft)
        })
        .await?;
    Ok(HttpResponse::Ok().json(author))
}

#[delete("/authors/{id}")]
pub async fn delete_author(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    db.run(move |conn| AuthorRepository::new(conn).delete(id))
        .await?;
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!("Author {} deleted", id))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_authors)
        .service(get_author)
        .service(create_author)
        .service(update_author)
        .service(delete_author);
}
