use crate::{
    db::{filters::SearchQuery, news_repository::NewsRepository, Database},
    errors::AppError,
    models::{
        news::{NewsView, NewsWrite},
        response::DeletedResponse,
    },
    routes::auth::require_admin,
    utils::{collect_form, FormData, MediaStore, UploadRule},
};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};
use validator::Validate;

const NEWS_FILES: &[(&str, &UploadRule)] = &[("image", &UploadRule::NEWS_IMAGE)];

fn news_write(form: &FormData) -> NewsWrite {
    NewsWrite {
        title: form.text("title"),
        content: form.text("content"),
        image: form.file("image"),
    }
}

#[get("/news")]
pub async fn list_news(
    db: web::Data<Database>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let news = db
        .run(move |conn| NewsRepository::new(conn).list(&query))
        .await?;
    Ok(HttpResponse::Ok().json(news.into_iter().map(NewsView::from).collect::<Vec<_>>()))
}

#[get("/news/{id}")]
pub async fn get_news(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let news = db.run(move |conn| NewsRepository::new(conn).get(id)).await?;
    Ok(HttpResponse::Ok().json(NewsView::from(news)))
}

#[post("/news")]
pub async fn create_news(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let form = collect_form(payload, &media, NEWS_FILES).await?;
    let saved = form.saved_files();
    let draft = news_write(&form).into_draft(None);

    let result = match draft.validate() {
        Ok(()) => {
            db.run(move |conn| NewsRepository::new(conn).create(&draft))
                .await
        }
        Err(e) => Err(AppError::from(e)),
    };

    let news = media.discard_on_error(&saved, result).await?;
    Ok(HttpResponse::Created().json(NewsView::from(news)))
}

#[route("/news/{id}", method = "PUT", method = "PATCH")]
pub async fn update_news(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    path: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let form = collect_form(payload, &media, NEWS_FILES).await?;
    let saved = form.saved_files();
    let write = news_write(&form);

    let result = db
        .run(move |conn| {
            let repo = NewsRepository::new(conn);
            let stored = repo.get(id)?;
            let draft = write.into_draft(Some(&stored));
            draft.validate()?;
            repo.update(id, &draft)
        })
        .await;

    let (news, replaced) = media.discard_on_error(&saved, result).await?;
    if let Some(old) = replaced {
        media.remove(&[old]).await;
    }
    Ok(HttpResponse::Ok().json(NewsView::from(news)))
}

#[delete("/news/{id}")]
pub async fn delete_news(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let image = db
        .run(move |conn| NewsRepository::new(conn).delete(id))
        .await?;
    if let Some(image) = image {
        media.remove(&[image]).await;
    }
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!("News item {} deleted", id))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_news)
        .service(get_news)
        .service(create_news)
        .service(update_news)
        .service(delete_news);
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{database, media, multipart, Part};
    use actix_web::{http::header, http::StatusCode, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn image_of_wrong_type_is_rejected() {
        let app = test_app!(database(), media());
        let cookie = login!(app);

        let (content_type, body) = multipart(&[
            Part::Text("title", "Conference"),
            Part::Text("content", "Body"),
            Part::File("image", "notes.txt", "text/plain", b"hello"),
        ]);
        let req = test::TestRequest::post()
            .uri("/api/news")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "FILE_PROCESSING_ERROR");
    }

    #[actix_web::test]
    async fn news_without_image_is_published() {
        let app = test_app!(database(), media());
        let cookie = login!(app);

        let (content_type, body) = multipart(&[
            Part::Text("title", "Conference"),
            Part::Text("content", "Body"),
        ]);
        let req = test::TestRequest::post()
            .uri("/api/news")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/api/news?search=conf").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["title"], "Conference");
        assert!(body[0]["image"].is_null());
    }
}
