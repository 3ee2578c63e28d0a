use crate::{
    db::{recent_issue_repository::RecentIssueRepository, Database},
    errors::AppError,
    models::{recent_issue::RecentIssueLinkPayload, response::DeletedResponse},
    routes::auth::require_admin,
};
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};
use validator::Validate;

#[get("/recent-issues")]
pub async fn list_links(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let links = db
        .run(|conn| RecentIssueRepository::new(conn).list())
        .await?;
    Ok(HttpResponse::Ok().json(links))
}

#[get("/recent-issues/{id}")]
pub async fn get_link(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let link = db
        .run(move |conn| RecentIssueRepository::new(conn).get(id))
        .await?;
    Ok(HttpResponse::Ok().json(link))
}

#[post("/recent-issues")]
pub async fn create_link(
    db: web::Data<Database>,
    session: Session,
    payload: web::Json<RecentIssueLinkPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let draft = payload.into_inner().into_draft(None);
    draft.validate()?;
    let link = db
        .run(move |conn| RecentIssueRepository::new(conn).create(&draft))
        .await?;
    Ok(HttpResponse::Created().json(link))
}

#[route("/recent-issues/{id}", method = "PUT", method = "PATCH")]
pub async fn update_link(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
    payload: web::Json<RecentIssueLinkPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let payload = payload.into_inner();
    let link = db
        .run(move |conn| {
            let repo = RecentIssueRepository::new(conn);
            let stored = repo.get(id)?;
            let draft = payload.into_draft(Some(&stored));
            draft.validate()?;
            repo.update(id, &draft)
        })
        .await?;
    Ok(HttpResponse::Ok().json(link))
}

#[delete("/recent-issues/{id}")]
pub async fn delete_link(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    db.run(move |conn| RecentIssueRepository::new(conn).delete(id))
        .await?;
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!(
        "Recent issue link {} deleted",
        id
    ))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_links)
        .service(get_link)
        .service(create_link)
        .service(update_link)
        .service(delete_link);
}
