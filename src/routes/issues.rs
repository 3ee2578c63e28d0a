use crate::{
    db::{
        filters::{parse_loose_bool, IssueFilter, IssueQuery},
        issue_repository::IssueRepository,
        Database,
    },
    errors::AppError,
    models::{issue::IssueWrite, response::DeletedResponse},
    routes::{auth::require_admin, required},
    utils::{collect_form, FormData, MediaStore, UploadRule},
};
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{delete, get, post, route, web, HttpResponse};
use chrono::NaiveDate;
use validator::Validate;

const ISSUE_FILES: &[(&str, &UploadRule)] = &[
    ("cover_image", &UploadRule::COVER_IMAGE),
    ("pdf_file", &UploadRule::ISSUE_PDF),
];

fn issue_write(form: &FormData) -> Result<IssueWrite, AppError> {
    let published_date = match form.text("published_date").map(|d| d.trim().to_string()) {
        Some(raw) if !raw.is_empty() => Some(
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| AppError::field("published_date", "Date must be YYYY-MM-DD"))?,
        ),
        _ => None,
    };
    Ok(IssueWrite {
        journal: form.parse::<i64>("journal")?,
        journal_type: form.text("journal_type"),
        title: form.text("title"),
        published_date,
        is_current: form.text("is_current").map(|v| parse_loose_bool(&v)),
        cover_image: form.file("cover_image"),
        pdf_file: form.file("pdf_file"),
    })
}

#[get("/issues")]
pub async fn list_issues(
    db: web::Data<Database>,
    query: web::Query<IssueQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = IssueFilter::from(query.into_inner());
    let issues = db
        .run(move |conn| {
            let repo = IssueRepository::new(conn);
            let issues = repo.list(&filter)?;
            repo.into_views(issues)
        })
        .await?;
    Ok(HttpResponse::Ok().json(issues))
}

/// Every issue currently flagged as current, one per journal type.
#[get("/issues/current")]
pub async fn current_issues(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let issues = db
        .run(|conn| {
            let repo = IssueRepository::new(conn);
            let issues = repo.current_issues()?;
            repo.into_views(issues)
        })
        .await?;
    Ok(HttpResponse::Ok().json(issues))
}

#[get("/issues/current/{journal_type}")]
pub async fn current_issue_for_type(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let journal_type = path.into_inner();
    let issue = db
        .run(move |conn| {
            let repo = IssueRepository::new(conn);
            let issue = repo.current_for_type(&journal_type)?;
            repo.into_view(issue)
        })
        .await?;
    Ok(HttpResponse::Ok().json(issue))
}

#[get("/issues/by-type/{journal_type}")]
pub async fn issues_by_type(
    db: web::Data<Database>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let journal_type = path.into_inner();
    let issues = db
        .run(move |conn| {
            let repo = IssueRepository::new(conn);
            let issues = repo.by_type(&journal_type)?;
            repo.into_views(issues)
        })
        .await?;
    Ok(HttpResponse::Ok().json(issues))
}

#[get("/issues/latest")]
pub async fn latest_issue(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let issue = db
        .run(|conn| {
            let repo = IssueRepository::new(conn);
            let issue = repo.latest()?;
            repo.into_view(issue)
        })
        .await?;
    Ok(HttpResponse::Ok().json(issue))
}

#[get("/issues/{id}")]
pub async fn get_issue(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let issue = db
        .run(move |conn| {
            let repo = IssueRepository::new(conn);
            let issue = repo.get(id)?;
            repo.into_view(issue)
        })
        .await?;
    Ok(HttpResponse::Ok().json(issue))
}

#[post("/issues")]
pub async fn create_issue(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let form = collect_form(payload, &media, ISSUE_FILES).await?;
    let saved = form.saved_files();

    let result = match issue_write(&form) {
        Ok(write) => {
            db.run(move |conn| {
                let draft = write.into_draft(None).map_err(required)?;
                draft.validate()?;
                let repo = IssueRepository::new(conn);
                let issue = repo.create(&draft)?;
                repo.into_view(issue)
            })
            .await
        }
        Err(e) => Err(e),
    };

    let issue = media.discard_on_error(&saved, result).await?;
    Ok(HttpResponse::Created().json(issue))
}

#[route("/issues/{id}", method = "PUT", method = "PATCH")]
pub async fn update_issue(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    path: web::Path<i64>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let form = collect_form(payload, &media, ISSUE_FILES).await?;
    let saved = form.saved_files();

    let result = match issue_write(&form) {
        Ok(write) => {
            db.run(move |conn| {
                let repo = IssueRepository::new(conn);
                let stored = repo.get(id)?;
                let draft = write.into_draft(Some(&stored)).map_err(required)?;
                draft.validate()?;
                let (issue, replaced) = repo.update(id, &draft)?;
                Ok((repo.into_view(issue)?, replaced))
            })
            .await
        }
        Err(e) => Err(e),
    };

    let (issue, replaced) = media.discard_on_error(&saved, result).await?;
    media.remove(&replaced).await;
    Ok(HttpResponse::Ok().json(issue))
}

#[post("/issues/{id}/set-current")]
pub async fn set_current_issue(
    db: web::Data<Database>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let issue = db
        .run(move |conn| {
            let repo = IssueRepository::new(conn);
            let issue = repo.set_current(id)?;
            repo.into_view(issue)
        })
        .await?;
    Ok(HttpResponse::Ok().json(issue))
}

#[delete("/issues/{id}")]
pub async fn delete_issue(
    db: web::Data<Database>,
    media: web::Data<MediaStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_admin(&session)?;
    let id = path.into_inner();
    let files = db
        .run(move |conn| IssueRepository::new(conn).delete(id))
        .await?;
    media.remove(&files).await;
    Ok(HttpResponse::Ok().json(DeletedResponse::new(format!("Issue {} deleted", id))))
}

/// Named lookups are registered ahead of `/issues/{id}` so they are not
/// swallowed by the identifier route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_issues)
        .service(current_issues)
        .service(current_issue_for_type)
        .service(issues_by_type)
        .service(latest_issue)
        .service(get_issue)
        .service(create_issue)
        .service(update_issue)
        .service(set_current_issue)
        .service(delete_issue);
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{database, media, multipart, seed, Part};
    use actix_web::{http::header, http::StatusCode, test};
    use serde_json::Value;

    const SEED: &str = "
        INSERT INTO journals (id, name, short_name) VALUES (1, 'Qishloq', 'QX'), (2, 'Agro', 'AI');
        INSERT INTO issues (id, journal_id, journal_type, title, published_date, is_current) VALUES
            (1, 1, 'QX', 'QX 2024-1', '2024-01-15', 1),
            (2, 1, 'QX', 'QX 2024-2', '2024-06-15', 0),
            (3, 2, 'AI', 'AI 2024-1', '2024-03-01', 1);
        INSERT INTO articles (id, issue_id, pages) VALUES (1, 1, '1-10');";

    #[actix_web::test]
    async fn journal_and_current_filters_combine_case_insensitively() {
        let db = database();
        seed(&db, SEED);
        let app = test_app!(db, media());

        let req = test::TestRequest::get()
            .uri("/api/issues?journal=qx&current=true")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let issues = body.as_array().unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0]["id"], 1);
        assert_eq!(issues[0]["journal_type"], "QX");
        assert_eq!(issues[0]["journal_name"], "Qishloq");
        assert_eq!(issues[0]["articles"][0]["pages"], "1-10");
    }

    #[actix_web::test]
    async fn blank_current_parameter_is_ignored() {
        let db = database();
        seed(&db, SEED);
        let app = test_app!(db, media());
        let req = test::TestRequest::get()
            .uri("/api/issues?current=")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn named_lookups() {
        let db = database();
        seed(&db, SEED);
        let app = test_app!(db, media());

        let req = test::TestRequest::get().uri("/api/issues/current").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let req = test::TestRequest::get().uri("/api/issues/current/ai").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], 3);

        let req = test::TestRequest::get().uri("/api/issues/by-type/QX").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let req = test::TestRequest::get().uri("/api/issues/latest").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], 2);
    }

    #[actix_web::test]
    async fn missing_current_issue_is_not_found() {
        let db = database();
        seed(&db, "INSERT INTO journals (id, name, short_name) VALUES (1, 'Q', 'QX');");
        let app = test_app!(db, media());

        let req = test::TestRequest::get().uri("/api/issues/current/QX").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/issues/latest").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn set_current_moves_the_flag() {
        let db = database();
        seed(&db, SEED);
        let app = test_app!(db, media());
        let cookie = login!(app);

        let req = test::TestRequest::post()
            .uri("/api/issues/2/set-current")
            .cookie(cookie)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_current"], true);

        let req = test::TestRequest::get().uri("/api/issues/1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_current"], false);

        let req = test::TestRequest::get().uri("/api/issues/3").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["is_current"], true);
    }

    #[actix_web::test]
    async fn multipart_create_stores_cover_and_demotes_previous_current() {
        let db = database();
        seed(&db, SEED);
        let store = media();
        let root = store.root().to_path_buf();
        let app = test_app!(db, store);
        let cookie = login!(app);

        let (content_type, body) = multipart(&[
            Part::Text("journal", "1"),
            Part::Text("title", "QX 2025-1"),
            Part::Text("published_date", "2025-01-10"),
            Part::Text("is_current", "ha"),
            Part::File("cover_image", "cover.png", "image/png", b"\x89PNG fake"),
        ]);
        let req = test::TestRequest::post()
            .uri("/api/issues")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["journal_type"], "QX");
        assert_eq!(created["is_current"], true);
        let cover = created["cover_image"].as_str().unwrap();
        assert!(cover.starts_with("/media/covers/"));
        assert!(root.join(cover.trim_start_matches("/media/")).exists());

        let req = test::TestRequest::get()
            .uri("/api/issues?journal=QX&current=1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "QX 2025-1");
    }

    #[actix_web::test]
    async fn failed_create_discards_uploaded_files() {
        let db = database();
        seed(&db, SEED);
        let store = media();
        let root = store.root().to_path_buf();
        let app = test_app!(db, store);
        let cookie = login!(app);

        let (content_type, body) = multipart(&[
            Part::Text("journal", "99"),
            Part::Text("title", "Orphan"),
            Part::Text("published_date", "2025-01-10"),
            Part::File("pdf_file", "issue.pdf", "application/pdf", b"%PDF-1.4"),
        ]);
        let req = test::TestRequest::post()
            .uri("/api/issues")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let leftover = std::fs::read_dir(root.join("issues"))
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftover, 0);
    }

    #[actix_web::test]
    async fn missing_published_date_is_required() {
        let db = database();
        seed(&db, SEED);
        let app = test_app!(db, media());
        let cookie = login!(app);

        let (content_type, body) = multipart(&[
            Part::Text("journal", "1"),
            Part::Text("title", "No date"),
        ]);
        let req = test::TestRequest::post()
            .uri("/api/issues")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"][0]["field"], "published_date");
    }
}
