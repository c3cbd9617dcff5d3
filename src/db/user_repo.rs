use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{from_millis, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    name: String,
    created_at: i64,
    updated_at: i64,
}

impl UserRow {
    fn into_credentials(self) -> Credentials {
        Credentials {
            password_hash: self.password_hash,
            user: User {
                id: self.id,
                email: self.email,
                name: self.name,
                created_at: from_millis(self.created_at),
                updated_at: from_millis(self.updated_at),
            },
        }
    }
}

/// A user together with the stored password hash, for login checks.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Errors that can occur when creating a user.
#[derive(Debug, thiserror::Error)]
pub enum UserRepoError {
    /// Another user already owns this email.
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new user. The caller supplies an already-hashed password.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<User, UserRepoError> {
        let now = Utc::now().timestamp_millis();

        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(UserRepoError::DuplicateEmail)
            }
            Err(e) => return Err(e.into()),
        };

        self.get_by_id(id)
            .await?
            .ok_or(UserRepoError::Database(sqlx::Error::RowNotFound))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.into_credentials().user))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Credentials>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserRow::into_credentials))
    }

    /// Sets the display name. Returns false if no such user exists.
    pub async fn update_name(&self, id: i64, name: &str) -> Result<bool, sqlx::Error> {
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self) -> Result<Vec<User>, sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_credentials().user)
            .collect())
    }
}
