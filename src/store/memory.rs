use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{toy_not_found, ToyStore, UserStore};
use crate::error::AppError;
use crate::models::{NewToy, Toy, ToyChanges, User, UserRecord};

/// In-process stores used when no database is configured, and by the tests.
///
/// Vectors keep insertion order, which is the order `find_all` reports.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<UserRecord>>,
    toys: RwLock<Vec<Toy>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.iter().any(|record| record.user.username == username) {
            return Err(AppError::DuplicateUsername);
        }

        let user = User::new(username);
        users.push(UserRecord {
            user: user.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|record| record.user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|record| record.user.id == id)
            .map(|record| record.user.clone()))
    }
}

#[async_trait]
impl ToyStore for MemoryStore {
    async fn create(&self, toy: NewToy) -> Result<Toy, AppError> {
        let toy = Toy::new(toy);
        self.toys.write().await.push(toy.clone());
        Ok(toy)
    }

    async fn find_all(&self) -> Result<Vec<Toy>, AppError> {
        Ok(self.toys.read().await.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Toy, AppError> {
        self.toys
            .read()
            .await
            .iter()
            .find(|toy| toy.id == id)
            .cloned()
            .ok_or_else(toy_not_found)
    }

    async fn update(&self, id: Uuid, changes: ToyChanges) -> Result<Toy, AppError> {
        let mut toys = self.toys.write().await;
        let toy = toys
            .iter_mut()
            .find(|toy| toy.id == id)
            .ok_or_else(toy_not_found)?;
        toy.apply(changes);
        Ok(toy.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut toys = self.toys.write().await;
        let before = toys.len();
        toys.retain(|toy| toy.id != id);
        if toys.len() == before {
            return Err(toy_not_found());
        }
        Ok(())
    }
}
