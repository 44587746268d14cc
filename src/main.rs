use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use toytrader::{
    auth::Credentials,
    config::Config,
    routes::{self, MethodOverride},
    session::{session_middleware, MemorySessionStore, RejectionFlash},
    state::AppState,
    store::{MemoryStore, PgStore, ToyStore, UserStore},
    upload::ImageStore,
};

const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

fn startup_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;

    let (users, toys): (Arc<dyn UserStore>, Arc<dyn ToyStore>) = match &config.database_url {
        Some(database_url) => {
            let pool = PgPool::connect(database_url).await.map_err(startup_error)?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(startup_error)?;
            log::info!("Connected to database, migrations applied");
            let store = Arc::new(PgStore::new(pool));
            (store.clone(), store)
        }
        None => {
            log::warn!("DATABASE_URL is not set, data is kept in memory and lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };

    tokio::fs::create_dir_all(&config.public_dir).await?;

    let credentials = Credentials::new(users, config.bcrypt_cost).map_err(startup_error)?;
    let images = ImageStore::new(&config.public_dir, config.max_upload_bytes);
    let state = web::Data::new(AppState::new(credentials, toys, images));
    let session_key = config.session_key().map_err(startup_error)?;
    let sessions = MemorySessionStore::new();
    let (session_ttl_hours, cookie_secure) = (config.session_ttl_hours, config.cookie_secure);

    let pruned = sessions.clone();
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(SESSION_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let removed = pruned.prune_expired().await;
            if removed > 0 {
                log::debug!("Pruned {} expired sessions", removed);
            }
        }
    });

    log::info!("Starting toytrader server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(RejectionFlash)
            .wrap(session_middleware(
                sessions.clone(),
                session_key.clone(),
                session_ttl_hours,
                cookie_secure,
            ))
            .wrap(MethodOverride)
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
