use actix_files as fs;
use actix_web::{cookie::Key, middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use env_logger::Env;
use journal_cms::{
    config::AppConfig,
    db::{admin_repository::AdminRepository, Database},
    errors::AppError,
    routes, session_middleware,
    utils::{security::hash_password, MediaStore},
};
use log::{error, info, warn};

/// Creates or refreshes the admin account named in the environment.
async fn seed_admin_user(db: &Database, config: &AppConfig) -> Result<(), AppError> {
    let (email, password) = match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => (email.clone(), password.clone()),
        _ => {
            warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set; skipping admin seeding");
            return Ok(());
        }
    };

    let hashed_password = web::block(move || hash_password(&password)).await??;
    let seeded_email = email.clone();
    let id = db
        .run(move |conn| AdminRepository::new(conn).upsert(&seeded_email, &hashed_password))
        .await?;
    info!("Admin account {} ready (id {})", email, id);
    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let db = Database::open(&config.database_path).map_err(|e| {
        error!("Failed to open database {}: {}", config.database_path, e);
        std::io::Error::other(e.to_string())
    })?;

    if let Err(e) = seed_admin_user(&db, &config).await {
        error!("Failed to seed admin user: {}", e);
    }

    let media = MediaStore::new(config.upload_dir.clone());
    if let Err(e) = media.ensure_dir() {
        warn!("Failed to create uploads directory: {}", e);
    }

    let secret_key = Key::from(config.session_secret.as_bytes());
    let cookie_secure = config.cookie_secure;
    let db = web::Data::new(db);
    let media = web::Data::new(media);

    info!("Starting server on http://{}:{}...", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(db.clone())
            .app_data(media.clone())
            .wrap(session_middleware(secret_key.clone(), cookie_secure))
            .wrap(Logger::default())
            .service(fs::Files::new("/media", media.root().to_path_buf()))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
