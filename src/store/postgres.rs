use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{toy_not_found, ToyStore, UserStore};
use crate::error::AppError;
use crate::models::{Author, NewToy, Toy, ToyChanges, User, UserRecord};

const TOY_COLUMNS: &str =
    "id, name, rent_price, sale_price, image_src, author_id, author_username, created_at";

/// Both stores backed by one PostgreSQL pool. Run `sqlx::migrate!()` before use.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            user: User {
                id: row.id,
                username: row.username,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        }
    }
}

#[derive(FromRow)]
struct ToyRow {
    id: Uuid,
    name: String,
    rent_price: String,
    sale_price: String,
    image_src: String,
    author_id: Uuid,
    author_username: String,
    created_at: DateTime<Utc>,
}

impl From<ToyRow> for Toy {
    fn from(row: ToyRow) -> Self {
        Toy {
            id: row.id,
            name: row.name,
            rent_price: row.rent_price,
            sale_price: row.sale_price,
            image_src: row.image_src,
            author: Author {
                id: row.author_id,
                username: row.author_username,
            },
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let user = User::new(username);

        let result = sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                Err(AppError::DuplicateUsername)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserRecord::from(row).user))
    }
}

#[async_trait]
impl ToyStore for PgStore {
    async fn create(&self, toy: NewToy) -> Result<Toy, AppError> {
        let toy = Toy::new(toy);

        let row = sqlx::query_as::<_, ToyRow>(&format!(
            "INSERT INTO toys ({TOY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {TOY_COLUMNS}"
        ))
        .bind(toy.id)
        .bind(&toy.name)
        .bind(&toy.rent_price)
        .bind(&toy.sale_price)
        .bind(&toy.image_src)
        .bind(toy.author.id)
        .bind(&toy.author.username)
        .bind(toy.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_all(&self) -> Result<Vec<Toy>, AppError> {
        let rows = sqlx::query_as::<_, ToyRow>(&format!(
            "SELECT {TOY_COLUMNS} FROM toys ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Toy::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Toy, AppError> {
        sqlx::query_as::<_, ToyRow>(&format!("SELECT {TOY_COLUMNS} FROM toys WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Toy::from)
            .ok_or_else(toy_not_found)
    }

    async fn update(&self, id: Uuid, changes: ToyChanges) -> Result<Toy, AppError> {
        // COALESCE keeps the stored value for every field that was not supplied.
        sqlx::query_as::<_, ToyRow>(&format!(
            "UPDATE toys SET \
                 name = COALESCE($2, name), \
                 rent_price = COALESCE($3, rent_price), \
                 sale_price = COALESCE($4, sale_price), \
                 image_src = COALESCE($5, image_src) \
             WHERE id = $1 \
             RETURNING {TOY_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.rent_price)
        .bind(changes.sale_price)
        .bind(changes.image_src)
        .fetch_optional(&self.pool)
        .await?
        .map(Toy::from)
        .ok_or_else(toy_not_found)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM toys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(toy_not_found());
        }

        Ok(())
    }
}
