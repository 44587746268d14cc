//! Persistence ports for users and toy listings, with a PostgreSQL adapter
//! for production and an in-memory adapter for development and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewToy, Toy, ToyChanges, User, UserRecord};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `AppError::DuplicateUsername` if the name is taken.
    async fn insert(&self, username: &str, password_hash: &str) -> Result<User, AppError>;

    /// Fetch a user and its password hash by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait ToyStore: Send + Sync {
    async fn create(&self, toy: NewToy) -> Result<Toy, AppError>;

    /// All listings in creation order.
    async fn find_all(&self) -> Result<Vec<Toy>, AppError>;

    /// Fails with `AppError::NotFound` for an unknown id.
    async fn find_by_id(&self, id: Uuid) -> Result<Toy, AppError>;

    /// Apply a partial update and return the stored result.
    async fn update(&self, id: Uuid, changes: ToyChanges) -> Result<Toy, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

pub(crate) fn toy_not_found() -> AppError {
    AppError::NotFound("Toy".into())
}
