//! Request-scoped sessions.
//!
//! Cookies, loading and persistence are handled by `actix-session`'s
//! `SessionMiddleware`, backed by the in-process `MemorySessionStore`. Handlers
//! reach the state through the `Session` extractor: the signed-in identity and
//! the one-shot flash messages.

pub mod middleware;
pub mod store;

use actix_session::{
    config::PersistentSession, Session as ActixSession, SessionExt, SessionMiddleware,
};
use actix_web::cookie::{time, Key, SameSite};
use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use middleware::RejectionFlash;
pub use store::MemorySessionStore;

/// Name of the cookie carrying the session key.
pub const SESSION_COOKIE: &str = "toytrader.sid";

const IDENTITY_KEY: &str = "identity";
const FLASH_KEY: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

/// Builds the session layer: an HttpOnly, SameSite=Lax cookie that lives for
/// `ttl_hours`, with state kept in `store`.
pub fn session_middleware(
    store: MemorySessionStore,
    key: Key,
    ttl_hours: i64,
    cookie_secure: bool,
) -> SessionMiddleware<MemorySessionStore> {
    SessionMiddleware::builder(store, key)
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .session_lifecycle(
            PersistentSession::default().session_ttl(time::Duration::hours(ttl_hours)),
        )
        .build()
}

/// Handle to the current request's session. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Session(ActixSession);

impl Session {
    /// The session attached to `req`. Without the session layer in front this
    /// is an empty session that is never stored.
    pub fn of(req: &HttpRequest) -> Self {
        Self(req.get_session())
    }

    pub fn identity(&self) -> Option<String> {
        match self.0.get::<String>(IDENTITY_KEY) {
            Ok(identity) => identity,
            Err(err) => {
                log::warn!("Unreadable identity in session: {}", err);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Binds the session to a user's serialized identity and rotates the session key.
    pub fn login(&self, identity: String) -> Result<(), AppError> {
        self.0.renew();
        self.0
            .insert(IDENTITY_KEY, identity)
            .map_err(|e| AppError::Internal(format!("Failed to store session identity: {}", e)))
    }

    /// Drops the identity binding and rotates the session key. Queued flash
    /// messages survive.
    pub fn logout(&self) {
        self.0.remove(IDENTITY_KEY);
        self.0.renew();
    }

    pub fn push_flash(&self, kind: FlashKind, text: impl Into<String>) {
        let mut flash = self.flash();
        flash.push(Flash {
            kind,
            text: text.into(),
        });
        if let Err(err) = self.0.insert(FLASH_KEY, flash) {
            log::error!("Failed to queue flash message: {}", err);
        }
    }

    /// Returns and clears every pending message of `kind`, oldest first.
    pub fn drain_flash(&self, kind: FlashKind) -> Vec<String> {
        let flash = self.flash();
        if !flash.iter().any(|message| message.kind == kind) {
            return Vec::new();
        }

        let (drained, kept): (Vec<Flash>, Vec<Flash>) =
            flash.into_iter().partition(|message| message.kind == kind);
        if kept.is_empty() {
            self.0.remove(FLASH_KEY);
        } else if let Err(err) = self.0.insert(FLASH_KEY, kept) {
            log::error!("Failed to keep flash messages: {}", err);
        }
        drained.into_iter().map(|message| message.text).collect()
    }

    fn flash(&self) -> Vec<Flash> {
        match self.0.get::<Vec<Flash>>(FLASH_KEY) {
            Ok(flash) => flash.unwrap_or_default(),
            Err(err) => {
                log::warn!("Unreadable flash messages in session: {}", err);
                Vec::new()
            }
        }
    }
}

impl FromRequest for Session {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Session::of(req)))
    }
}
