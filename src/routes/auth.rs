use crate::{
    db::{admin_repository::AdminRepository, Database},
    errors::AppError,
    models::admin::LoginPayload,
    utils::security::verify_password,
};
use actix_session::Session;
use actix_web::{post, web, HttpResponse};
use log::{info, warn};
use serde::Serialize;
use validator::Validate;

pub const ADMIN_SESSION_KEY: &str = "admin_id";

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    email: String,
}

/// Id of the logged-in admin, or a permission error for everyone else.
pub fn require_admin(session: &Session) -> Result<i64, AppError> {
    match session.get::<i64>(ADMIN_SESSION_KEY) {
        Ok(Some(admin_id)) => Ok(admin_id),
        Ok(None) => {
            warn!("Rejected write from a session without admin rights");
            Err(AppError::PermissionDenied(
                "Admin privileges are required for this action".to_string(),
            ))
        }
        Err(e) => {
            warn!("Unreadable session during admin check: {}", e);
            Err(AppError::PermissionDenied(
                "Admin privileges are required for this action".to_string(),
            ))
        }
    }
}

#[post("/auth/login")]
pub async fn login(
    db: web::Data<Database>,
    session: Session,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    payload.validate()?;

    let email = payload.email.trim().to_string();
    let lookup_email = email.clone();
    let admin = db
        .run(move |conn| AdminRepository::new(conn).find_by_email(&lookup_email))
        .await?;

    let Some(admin) = admin else {
        warn!("Admin login failed (email not found): {}", email);
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    };

    let stored_hash = admin.password_hash.clone();
    let password = payload.password;
    let matches = web::block(move || verify_password(&password, &stored_hash)).await??;
    if !matches {
        warn!("Admin login failed (wrong password) for email: {}", email);
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    session
        .insert(ADMIN_SESSION_KEY, admin.id)
        .map_err(|e| AppError::StorageError(format!("Session insert error: {}", e)))?;
    session.renew();
    info!("Admin login successful for email: {}", admin.email);

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        email: admin.email,
    }))
}

#[post("/auth/logout")]
pub async fn logout(session: Session) -> HttpResponse {
    match session.get::<i64>(ADMIN_SESSION_KEY) {
        Ok(Some(id)) => info!("Admin logout successful for ID: {}", id),
        Ok(None) => info!("Logout requested without an admin session"),
        Err(e) => warn!("Error reading admin_id during logout: {}", e),
    }
    session.purge();
    HttpResponse::NoContent().finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login).service(logout);
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{database, media, ADMIN_EMAIL};
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        let app = test_app!(database(), media());
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({"email": ADMIN_EMAIL, "password": "nope"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "UNAUTHORIZED_ERROR");
    }

    #[actix_web::test]
    async fn malformed_login_body_is_a_validation_error() {
        let app = test_app!(database(), media());
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({"email": "not-an-email", "password": "x"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"][0]["field"], "email");
    }

    #[actix_web::test]
    async fn login_then_logout() {
        let app = test_app!(database(), media());
        let cookie = login!(app);
        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
