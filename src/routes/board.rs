use crate::{
    db::{board_repository::BoardRepository, filters::BoardQuery, Database},
    errors::AppError,
    models::{board::BoardMemberPayload, response::DeletedResponse},
    routes::{auth::require_admin, required},
};
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};
use validator::Validate;

#[get("/board-members")]
pub async fn list_members(
    db: web::Data<Database>,
    query: web::Query<BoardQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let members = db
        .run(move |conn| BoardRepository::new(conn).list(&query))
        .await?;
    Ok(HttpResponse::Ok().json(members))
}

#[get("/board-members/{id}")]
pub async fn get_member(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let member = db.run(move |conn| BoardRepository::new(conn).get(id)).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[post("/board-members")]
pub async fn create_member(
    db: web::Data<Database>,
    session: Session,
    payload: web::Json<BoardMemberPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let draft = payload.into_inner().into_draft(None).map_err(required)?;
    draft.validate()?;
    let member = db
        .run(move |conn| BoardRepository::new(conn).create(&draft))
        .await?;
    Ok(HttpResponse::Created().json(member))
}

#[route("/board-members/{id}", method = "PUT", method = "PATCH")]
pub async fn update_member(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
    payload: web::Json<BoardMemberPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let payload = payload.into_inner();
    let member = db
        .run(move |conn| {
            let repo = BoardRepository::new(conn);
            let stored = repo.get(id)?;
            let draft = payload.into_draft(Some(&stored)).map_err(required)?;
            draft.validate()?;
            repo.update(id, &draft)
        })
        .await?;
    Ok(HttpResponse::Ok().json(member))
}

#[delete("/board-members/{id}")]
pub async fn delete_member(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    db.run(move |conn| BoardRepository::new(conn).delete(id))
        .await?;
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!(
        "Board member {} deleted",
        id
    ))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_members)
        .service(get_member)
        .service(create_member)
        .service(update_member)
        .service(delete_member);
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{database, media, seed};
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn members_filtered_by_journal_and_role() {
        let db = database();
        seed(
            &db,
            "INSERT INTO journals (id, name, short_name) VALUES (1, 'Q', 'QX'), (2, 'A', 'AI');
             INSERT INTO board_members (journal_id, full_name, position_description, role, display_order) VALUES
                (1, 'Member QX', 'Prof', 'hayat_azosi', 2),
                (1, 'Chief QX', 'Prof', 'bosh_muharrir', 1),
                (2, 'Chief AI', 'Prof', 'bosh_muharrir', 1);",
        );
        let app = test_app!(db, media());

        let req = test::TestRequest::get()
            .uri("/api/board-members?journal=Qx")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["full_name"], "Chief QX");
        assert_eq!(body[0]["role"], "bosh_muharrir");

        let req = test::TestRequest::get()
            .uri("/api/board-members?role=bosh_muharrir")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn unknown_role_is_rejected() {
        let db = database();
        seed(&db, "INSERT INTO journals (id, name, short_name) VALUES (1, 'Q', 'QX');");
        let app = test_app!(db, media());
        let cookie = login!(app);

        let req = test::TestRequest::post()
            .uri("/api/board-members")
            .cookie(cookie)
            .set_json(json!({
                "journal": 1,
                "full_name": "A. Valiyev",
                "position_description": "Prof",
                "role": "janitor"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
