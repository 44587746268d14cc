use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{hash_password, verify_password, RegisterRequest, MAX_PASSWORD_BYTES};
use crate::error::AppError;
use crate::models::User;
use crate::store::UserStore;

/// Registers and authenticates users on top of a `UserStore`.
///
/// Passwords are hashed with bcrypt at `cost` on a blocking thread so the
/// request workers stay responsive. Plaintext passwords are never stored or logged.
pub struct Credentials {
    users: Arc<dyn UserStore>,
    cost: u32,
    // Verified against when the username is unknown, so both failure paths do the same work.
    dummy_hash: String,
}

impl Credentials {
    pub fn new(users: Arc<dyn UserStore>, cost: u32) -> Result<Self, AppError> {
        let dummy_hash = hash_password("toytrader-dummy-password", cost)?;
        Ok(Self {
            users,
            cost,
            dummy_hash,
        })
    }

    /// Creates a user from a registration form.
    ///
    /// # Returns
    /// The new `User`, `AppError::ValidationFailure` for a malformed form or
    /// `AppError::DuplicateUsername` when the name is taken.
    pub async fn register(&self, input: &RegisterRequest) -> Result<User, AppError> {
        input.validate()?;

        if self.users.find_by_username(&input.username).await?.is_some() {
            return Err(AppError::DuplicateUsername);
        }

        let password = input.password.clone();
        let cost = self.cost;
        let password_hash = blocking(move || hash_password(&password, cost)).await?;

        let user = self.users.insert(&input.username, &password_hash).await?;
        log::info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Checks a username and password.
    ///
    /// An unknown username, a wrong password and a password longer than any
    /// stored one can be all yield `AppError::InvalidCredentials`.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let record = if password.len() > MAX_PASSWORD_BYTES {
            None
        } else {
            self.users.find_by_username(username).await?
        };

        let (user, password_hash) = match record {
            Some(record) => (Some(record.user), record.password_hash),
            None => (None, self.dummy_hash.clone()),
        };

        let password = password.to_string();
        let matches = blocking(move || verify_password(&password, &password_hash)).await?;

        match user {
            Some(user) if matches => Ok(user),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    /// The token a session stores to remember who is signed in.
    pub fn serialize(&self, user: &User) -> String {
        user.id.to_string()
    }

    /// Restores a user from a session token.
    pub async fn deserialize(&self, token: &str) -> Result<User, AppError> {
        let id = Uuid::parse_str(token).map_err(|_| AppError::NotFound("User".into()))?;
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))
    }
}

async fn blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Internal(format!("Password task failed: {}", e)))?
}
