use actix_session::{config::PersistentSession, storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use rand::{distributions::Alphanumeric, Rng};
use vitablog::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Third-party initialization first, then our own services.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().expect("Configuration failed to load.");

    let db = vitablog::db::connect(&config.database_url)
        .await
        .expect("Database connection failed.");

    let http_client = vitablog::geo::http_client();

    let secret_key = match &config.secret_key {
        Some(key) if key.len() >= 64 => Key::from(key.as_bytes()),
        _ => {
            let random_string: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(128)
                .map(char::from)
                .collect();
            log::warn!("SECRET_KEY missing or shorter than 64 bytes. Session cookies will invalidate every time the application restarts. Need a key? How about:\r\n{}", random_string);
            Key::from(random_string.as_bytes())
        }
    };

    let bind_addr = config.bind_addr.clone();
    log::info!("Starting vitablog on {}", bind_addr);

    HttpServer::new(move || {
        // Middleware executes in reverse registration order; services are
        // matched top-down.
        App::new()
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(http_client.clone()))
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_same_site(SameSite::Lax)
                    .cookie_secure(false) // Allow HTTP for development
                    .session_lifecycle(PersistentSession::default())
                    .build(),
            )
            .wrap(Logger::new("%a %{User-Agent}i"))
            .configure(vitablog::web::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
