use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod utils;

pub const SESSION_COOKIE: &str = "journal-cms-session";

pub fn session_middleware(key: Key, cookie_secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_secure(cookie_secure)
        .cookie_path("/".to_string())
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .build()
}
