use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("username already taken")]
    DuplicateUsername,
    #[error("email already taken")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for shared::UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            firstname: user.firstname,
            lastname: user.lastname,
            email: user.email,
            username: user.username,
            active: user.active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub active: bool,
    pub password_hash: Option<String>,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, firstname, lastname, email, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.firstname)
        .bind(&new_user.lastname)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserStoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User, UserStoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2,
                firstname = $3,
                lastname = $4,
                email = $5,
                active = $6,
                password_hash = COALESCE($7, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.username)
        .bind(&update.firstname)
        .bind(&update.lastname)
        .bind(&update.email)
        .bind(update.active)
        .bind(&update.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        user.ok_or(UserStoreError::NotFound)
    }
}

/// Translates Postgres unique-constraint violations into the client-facing
/// duplicate errors the registration flow reports.
fn map_unique_violation(err: sqlx::Error) -> UserStoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.constraint() {
            Some("users_username_key") => return UserStoreError::DuplicateUsername,
            Some("users_email_key") => return UserStoreError::DuplicateEmail,
            _ => {}
        }
    }
    UserStoreError::Database(err)
}
