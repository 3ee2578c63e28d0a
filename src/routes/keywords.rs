use crate::{
    db::{filters::SearchQuery, keyword_repository::KeywordRepository, Database},
    errors::AppError,
    models::{author::KeywordPayload, response::DeletedResponse},
    routes::auth::require_admin,
};
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};

#[get("/keywords")]
pub async fn list_keywords(
    db: web::Data<Database>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let keywords = db
        .run(move |conn| KeywordRepository::new(conn).list(&query))
        .await?;
    Ok(HttpResponse::Ok().json(keywords))
}

#[get("/keywords/{id}")]
pub async fn get_keyword(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let keyword = db.run(move |conn| KeywordRepository::new(conn).get(id)).await?;
    Ok(HttpResponse::Ok().json(keyword))
}

#[post("/keywords")]
pub async fn create_keyword(
    db: web::Data<Database>,
    session: Session,
    payload: web::Json<KeywordPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let name = payload.into_inner().into_name()?;
    let keyword = db
        .run(move |conn| KeywordRepository::new(conn).create(&name))
        .await?;
    Ok(HttpResponse::Created().json(keyword))
}

#[route("/keywords/{id}", method = "PUT", method = "PATCH")]
pub async fn update_keyword(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
    payload: web::Json<KeywordPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let payload = payload.into_inner();
    let keyword = db
        .run(move |conn| {
            let repo = KeywordRepository::new(conn);
            let stored = repo.get(id)?;
            // Only `name` is writable; an absent name keeps the stored one.
            let name = match payload.name {
                None => stored.name,
                Some(_) => payload.into_name()?,
            };
            repo.update(id, &name)
        })
        .await?;
    Ok(HttpResponse::Ok().json(keyword))
}

#[delete("/keywords/{id}")]
pub async fn delete_keyword(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    db.run(move |conn| KeywordRepository::new(conn).delete(id))
        .await?;
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!("Keyword {} deleted", id))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_keywords)
        .service(get_keyword)
        .service(create_keyword)
        .service(update_keyword)
        .service(delete_keyword);
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{database, media};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn keyword_names_are_trimmed_and_required() {
        let app = test_app!(database(), media());
        let cookie = login!(app);

        let req = test::TestRequest::post()
            .uri("/api/keywords")
            .cookie(cookie.clone())
            .set_json(json!({"name": "  soil  "}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "soil");

        let req = test::TestRequest::post()
            .uri("/api/keywords")
            .cookie(cookie)
            .set_json(json!({"name": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"][0]["field"], "name");
    }
}
