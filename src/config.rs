use actix_web::cookie::Key;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;

pub struct Config {
    /// When unset the application runs on the in-memory stores.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    /// Keys the session cookie. At least 64 bytes.
    pub session_secret: String,
    pub session_ttl_hours: i64,
    /// Marks the session cookie `Secure`. Enable behind HTTPS.
    pub cookie_secure: bool,
    /// Root of the public asset tree; images are written to `<public_dir>/uploads`.
    pub public_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            server_port: parse_var("SERVER_PORT", 3000)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            session_secret: env::var("SESSION_SECRET")
                .map_err(|_| AppError::Internal("SESSION_SECRET must be set".into()))?,
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", 24)?,
            cookie_secure: parse_var("COOKIE_SECURE", false)?,
            public_dir: env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10_000_000)?,
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }

    pub fn session_key(&self) -> Result<Key, AppError> {
        Key::try_from(self.session_secret.as_bytes()).map_err(|e| {
            AppError::Internal(format!("SESSION_SECRET must be at least 64 bytes: {}", e))
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Internal(format!("{} has an invalid value {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}
