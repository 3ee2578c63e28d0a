use crate::errors::AppError;
use actix_web::web;

/// Builds a test service over the full `/api` tree with a logged-out session.
#[cfg(test)]
macro_rules! test_app {
    ($db:expr, $media:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($db))
                .app_data(actix_web::web::Data::new($media))
                .wrap($crate::session_middleware(
                    actix_web::cookie::Key::from(&[7u8; 64][..]),
                    false,
                ))
                .configure($crate::routes::configure),
        )
        .await
    };
}

/// Logs in as the seeded admin and yields the session cookie.
#[cfg(test)]
macro_rules! login {
    ($app:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(serde_json::json!({
                "email": $crate::routes::test_support::ADMIN_EMAIL,
                "password": $crate::routes::test_support::ADMIN_PASSWORD,
            }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert!(resp.status().is_success(), "login failed: {}", resp.status());
        resp.response()
            .cookies()
            .find(|c| c.name() == $crate::SESSION_COOKIE)
            .map(|c| c.into_owned())
            .expect("session cookie")
    }};
}

pub mod articles;
pub mod auth;
pub mod authors;
pub mod board;
pub mod contact;
pub mod health;
pub mod issues;
pub mod journals;
pub mod keywords;
pub mod news;
pub mod recent_issues;

/// Registers the whole API under `/api`, with extractor errors rendered as
/// the crate's JSON error body.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(
            web::scope("/api")
                .configure(health::configure)
                .configure(auth::configure)
                .configure(journals::configure)
                .configure(issues::configure)
                .configure(articles::configure)
                .configure(authors::configure)
                .configure(keywords::configure)
                .configure(board::configure)
                .configure(recent_issues::configure)
                .configure(news::configure)
                .configure(contact::configure),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(1024 * 1024)
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        AppError::NotFound(format!("Invalid resource identifier: {}", err)).into()
    })
}

/// Maps a missing required field reported by a payload merge.
pub(crate) fn required(field: &'static str) -> AppError {
    AppError::field(field, "This field is required")
}
