use crate::{
    db::{
        article_repository::{ArticleRelations, ArticleRepository},
        filters::ArticleQuery,
        Database,
    },
    errors::AppError,
    models::{
        article::{
            translations_for_create, translations_for_update, ArticleWrite, TranslationsChange,
        },
        response::DeletedResponse,
    },
    routes::{auth::require_admin, required},
    utils::{collect_form, FormData, MediaStore, UploadRule},
};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};
use serde::Serialize;
use validator::Validate;

const ARTICLE_FILES: &[(&str, &UploadRule)] = &[("article_file", &UploadRule::ARTICLE_FILE)];

#[derive(Serialize)]
struct ViewsResponse {
    id: i64,
    views: i64,
}

/// Identifiers sent as repeated fields, comma-separated, or a JSON-style list.
/// `None` when the field was not sent at all.
fn id_list(form: &FormData, name: &'static str) -> Result<Option<Vec<i64>>, AppError> {
    let Some(values) = form.texts(name) else {
        return Ok(None);
    };
    values
        .iter()
        .flat_map(|v| v.trim().trim_start_matches('[').trim_end_matches(']').split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| AppError::field(name, format!("Invalid identifier '{}'", v)))
        })
        .collect::<Result<Vec<i64>, _>>()
        .map(Some)
}

fn article_write(form: &FormData) -> Result<ArticleWrite, AppError> {
    Ok(ArticleWrite {
        issue: form.parse::<i64>("issue")?,
        doi: form.text("doi"),
        pages: form.text("pages"),
        references: form.text("references"),
        authors: id_list(form, "authors")?,
        keywords: id_list(form, "keywords")?,
        translations_payload: form.text("translations_payload"),
        article_file: form.file("article_file"),
    })
}

#[get("/articles")]
pub async fn list_articles(
    db: web::Data<Database>,
    query: web::Query<ArticleQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = query
        .into_inner()
        .into_filter()
        .map_err(|field| AppError::field(field, "Must be a numeric identifier"))?;
    let articles = db
        .run(move |conn| ArticleRepository::new(conn).list(&filter))
        .await?;
    Ok(HttpResponse::Ok().json(articles))
}

#[get("/articles/{id}")]
pub async fn get_article(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let article = db
        .run(move |conn| ArticleRepository::new(conn).get_view(id))
        .await?;
    Ok(HttpResponse::Ok().json(article))
}

#[post("/articles")]
pub async fn create_article(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let form = collect_form(payload, &media, ARTICLE_FILES).await?;
    let saved = form.saved_files();

    let result = match article_write(&form) {
        Ok(write) => {
            db.run(move |conn| {
                let draft = write.draft(None).map_err(required)?;
                draft.validate()?;
                let relations = ArticleRelations {
                    authors: write.authors,
                    keywords: write.keywords,
                    translations: TranslationsChange::Replace(translations_for_create(
                        write.translations_payload.as_deref(),
                    )),
                };
                ArticleRepository::new(conn).create(&draft, &relations)
            })
            .await
        }
        Err(e) => Err(e),
    };

    let article = media.discard_on_error(&saved, result).await?;
    Ok(HttpResponse::Created().json(article))
}

#[route("/articles/{id}", method = "PUT", method = "PATCH")]
pub async fn update_article(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    path: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let form = collect_form(payload, &media, ARTICLE_FILES).await?;
    let saved = form.saved_files();

    let result = match article_write(&form) {
        Ok(write) => {
            db.run(move |conn| {
                let repo = ArticleRepository::new(conn);
                let stored = repo.get(id)?;
                let draft = write.draft(Some(&stored)).map_err(required)?;
                draft.validate()?;
                let relations = ArticleRelations {
                    authors: write.authors,
                    keywords: write.keywords,
                    translations: translations_for_update(write.translations_payload.as_deref()),
                };
                repo.update(id, &draft, &relations)
            })
            .await
        }
        Err(e) => Err(e),
    };

    let (article, replaced) = media.discard_on_error(&saved, result).await?;
    media.remove(&replaced).await;
    Ok(HttpResponse::Ok().json(article))
}

#[delete("/articles/{id}")]
pub async fn delete_article(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let files = db
        .run(move |conn| ArticleRepository::new(conn).delete(id))
        .await?;
    media.remove(&files).await;
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!("Article {} deleted", id))))
}

/// Counts one read of the article; open to everyone.
#[post("/articles/{id}/view")]
pub async fn record_view(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let views = db
        .run(move |conn| ArticleRepository::new(conn).increment_views(id))
        .await?;
    Ok(HttpResponse::Ok().json(ViewsResponse { id, views }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_articles)
        .service(get_article)
        .service(create_article)
        .service(update_article)
        .service(delete_article)
        .service(record_view);
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{database, media, multipart, seed, Part};
    use actix_web::{http::header, http::StatusCode, test};
    use serde_json::Value;

    const SEED: &str = "
        INSERT INTO journals (id, name, short_name) VALUES (1, 'Qishloq', 'QX');
        INSERT INTO issues (id, journal_id, journal_type, title, published_date) VALUES
            (1, 1, 'QX', 'QX 2024-1', '2024-01-15');
        INSERT INTO authors (id, last_name, first_name, orcid_id) VALUES
            (1, 'Karimov', 'Aziz', '0000-0002-1495-3967'), (2, 'Usmonova', 'Nilufar', NULL);
        INSERT INTO keywords (id, name) VALUES (1, 'soil');";

    macro_rules! send_form {
        ($app:expr, $req:expr, $parts:expr) => {{
            let (content_type, body) = multipart($parts);
            let req = $req
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(body)
                .to_request();
            test::call_service(&$app, req).await
        }};
    }

    #[actix_web::test]
    async fn nested_write_then_translation_replace_and_swallow() {
        let db = database();
        seed(&db, SEED);
        let app = test_app!(db, media());
        let cookie = login!(app);

        let resp = send_form!(
            app,
            test::TestRequest::post().uri("/api/articles").cookie(cookie.clone()),
            &[
                Part::Text("issue", "1"),
                Part::Text("pages", "1-10"),
                Part::Text("authors", "1,2"),
                Part::Text("keywords", "1"),
                Part::Text(
                    "translations_payload",
                    r#"[{"language":"uz","title":"Tuproq","abstract":"u"},{"language":"ru","title":"Pochva","abstract":"r"}]"#,
                ),
            ]
        );
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["authors"].as_array().unwrap().len(), 2);
        assert_eq!(created["authors"][0]["orcid_id"], "0000-0002-1495-3967");
        assert_eq!(created["keywords"][0]["name"], "soil");
        assert_eq!(created["translations"].as_array().unwrap().len(), 2);

        let resp = send_form!(
            app,
            test::TestRequest::patch()
                .uri(&format!("/api/articles/{}", id))
                .cookie(cookie.clone()),
            &[Part::Text(
                "translations_payload",
                r#"[{"language":"en","title":"T","abstract":"A"}]"#
            )]
        );
        assert_eq!(resp.status(), StatusCode::OK);
        let updated: Value = test::read_body_json(resp).await;
        let translations = updated["translations"].as_array().unwrap();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0]["language"], "en");
        assert_eq!(translations[0]["abstract"], "A");
        assert_eq!(updated["authors"].as_array().unwrap().len(), 2);

        let resp = send_form!(
            app,
            test::TestRequest::put()
                .uri(&format!("/api/articles/{}", id))
                .cookie(cookie),
            &[
                Part::Text("translations_payload", "not valid json"),
                Part::Text("pages", "11-20"),
            ]
        );
        assert_eq!(resp.status(), StatusCode::OK);
        let kept: Value = test::read_body_json(resp).await;
        assert_eq!(kept["pages"], "11-20");
        assert_eq!(kept["translations"], updated["translations"]);
    }

    #[actix_web::test]
    async fn unknown_keyword_is_a_field_error() {
        let db = database();
        seed(&db, SEED);
        let app = test_app!(db, media());
        let cookie = login!(app);

        let resp = send_form!(
            app,
            test::TestRequest::post().uri("/api/articles").cookie(cookie),
            &[
                Part::Text("issue", "1"),
                Part::Text("pages", "1-10"),
                Part::Text("keywords", "1"),
                Part::Text("keywords", "42"),
            ]
        );
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"][0]["field"], "keywords");
    }

    #[actix_web::test]
    async fn non_numeric_issue_filter_is_rejected() {
        let app = test_app!(database(), media());
        let req = test::TestRequest::get()
            .uri("/api/articles?issue=abc")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn view_counter_is_open_to_everyone() {
        let db = database();
        seed(&db, SEED);
        seed(&db, "INSERT INTO articles (id, issue_id, pages) VALUES (5, 1, '1-2');");
        let app = test_app!(db, media());

        let req = test::TestRequest::post().uri("/api/articles/5/view").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["views"], 1);

        let req = test::TestRequest::get().uri("/api/articles?journal=qx").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["views"], 1);
    }
}
