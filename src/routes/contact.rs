use crate::{
    db::{contact_repository::ContactRepository, filters::ContactQuery, Database},
    errors::AppError,
    models::{
        contact::{ContactMessagePayload, ContactStatusPayload},
        response::DeletedResponse,
    },
    routes::auth::require_admin,
    utils::{collect_form, MediaStore, UploadRule},
};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};
use log::info;
use validator::Validate;

const ATTACHMENT_FIELD: &str = "file";

/// Visitors may write without logging in.
#[post("/contact")]
pub async fn create_message(
    db: web::Data<Database>,
    payload: web::Json<ContactMessagePayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner().trimmed();
    payload.validate()?;
    let message = db
        .run(move |conn| ContactRepository::new(conn).create(&payload))
        .await?;
    Ok(HttpResponse::Created().json(message))
}

#[post("/contact/{id}/attachments")]
pub async fn upload_attachment(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    path: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let form = collect_form(
        payload,
        &media,
        &[(ATTACHMENT_FIELD, &UploadRule::CONTACT_ATTACHMENT)],
    )
    .await?;
    let stored = form
        .file(ATTACHMENT_FIELD)
        .ok_or_else(|| AppError::field(ATTACHMENT_FIELD, "No file was uploaded"))?;

    let path_for_db = stored.clone();
    let result = db
        .run(move |conn| ContactRepository::new(conn).add_file(id, &path_for_db))
        .await;
    let file = media.discard_on_error(&[stored], result).await?;
    info!("Attached {} to contact message {}", file.file, id);
    Ok(HttpResponse::Created().json(file))
}

#[get("/contact")]
pub async fn list_messages(
    db: web::Data<Database>,
    session: Session,
    query: web::Query<ContactQuery>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let query = query.into_inner();
    let messages = db
        .run(move |conn| ContactRepository::new(conn).list(&query))
        .await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[get("/contact/{id}")]
pub async fn get_message(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let message = db
        .run(move |conn| ContactRepository::new(conn).get(id))
        .await?;
    Ok(HttpResponse::Ok().json(message))
}

/// Marks a message read or unread.
#[route("/contact/{id}", method = "PUT", method = "PATCH")]
pub async fn update_message_status(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
    payload: web::Json<ContactStatusPayload>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let is_read = payload.is_read;
    let message = db
        .run(move |conn| ContactRepository::new(conn).set_read(id, is_read))
        .await?;
    Ok(HttpResponse::Ok().json(message))
}

#[delete("/contact/{id}")]
pub async fn delete_message(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let files = db
        .run(move |conn| ContactRepository::new(conn).delete(id))
        .await?;
    media.remove(&files).await;
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!(
        "Contact message {} deleted",
        id
    ))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_message)
        .service(upload_attachment)
        .service(list_messages)
        .service(get_message)
        .service(update_message_status)
        .service(delete_message);
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{database, media, multipart, Part};
    use actix_web::{http::header, http::StatusCode, test};
    use serde_json::{json, Value};

    macro_rules! attach {
        ($app:expr, $id:expr, $parts:expr) => {{
            let (content_type, body) = multipart($parts);
            let req = test::TestRequest::post()
                .uri(&format!("/api/contact/{}/attachments", $id))
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(body)
                .to_request();
            let resp = test::call_service(&$app, req).await;
            let status = resp.status();
            let body: Value = test::read_body_json(resp).await;
            (status, body)
        }};
    }

    #[actix_web::test]
    async fn visitor_sends_message_with_attachment_and_admin_reads_it() {
        let app = test_app!(database(), media());

        let req = test::TestRequest::post()
            .uri("/api/contact")
            .set_json(json!({
                "name": "Dilnoza",
                "email": "dilnoza@example.uz",
                "subject": "Submission",
                "message": "Please find my paper attached."
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = created["id"].as_i64().unwrap();

        let (status, file) = attach!(
            app,
            id,
            &[Part::File("file", "paper.pdf", "application/pdf", b"%PDF-1.4")]
        );
        assert_eq!(status, StatusCode::CREATED);
        assert!(file["url"].as_str().unwrap().starts_with("/media/contact_files/"));

        let req = test::TestRequest::get()
            .uri(&format!("/api/contact/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let cookie = login!(app);
        let req = test::TestRequest::get()
            .uri(&format!("/api/contact/{}", id))
            .cookie(cookie.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["files"].as_array().unwrap().len(), 1);
        assert_eq!(body["is_read"], false);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/contact/{}", id))
            .cookie(cookie.clone())
            .set_json(json!({"is_read": true}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_read"], true);

        let req = test::TestRequest::get()
            .uri("/api/contact?is_read=no")
            .cookie(cookie)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn attachment_rules() {
        let app = test_app!(database(), media());
        let req = test::TestRequest::post()
            .uri("/api/contact")
            .set_json(json!({
                "name": "A", "email": "a@example.uz", "subject": "S", "message": "M"
            }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = attach!(app, id, &[Part::Text("note", "no file here")]);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"][0]["field"], "file");

        let (status, _) = attach!(
            app,
            id,
            &[Part::File("file", "photo.png", "image/png", b"\x89PNG")]
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let oversized = vec![0u8; 20 * 1024 * 1024 + 1];
        let (status, body) = attach!(
            app,
            id,
            &[Part::File("file", "big.pdf", "application/pdf", &oversized)]
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("20 MB"));

        let (status, _) = attach!(
            app,
            999,
            &[Part::File("file", "paper.pdf", "application/pdf", b"%PDF")]
        );
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn invalid_email_is_a_field_error() {
        let app = test_app!(database(), media());
        let req = test::TestRequest::post()
            .uri("/api/contact")
            .set_json(json!({
                "name": "A", "email": "nope", "subject": "S", "message": "M"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"][0]["field"], "email");
    }
}
