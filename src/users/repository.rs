// Credential store: repository contract and PostgreSQL implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::{
    error::StoreError,
    models::{NewUser, UniqueField, User},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

/// Persistence operations the user service depends on
///
/// Implementations must enforce uniqueness of username and email on every
/// write and report a collision as `StoreError::UniqueViolation`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Single lookup matching either column
    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    /// Overwrite every mutable column of an existing record, refreshing `updated_at`
    ///
    /// Returns `None` when no record has `user.id`.
    async fn save(&self, user: &User) -> Result<Option<User>, StoreError>;

    /// Returns whether a record was removed
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;
}

impl UniqueField {
    /// Identify the column behind a unique constraint name
    pub fn from_constraint(constraint: &str) -> Self {
        if constraint.contains("email") {
            UniqueField::Email
        } else {
            UniqueField::Username
        }
    }
}

/// Map write errors, turning unique violations into `StoreError::UniqueViolation`
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = UniqueField::from_constraint(db_err.constraint().unwrap_or_default());
            return StoreError::UniqueViolation(field);
        }
    }
    StoreError::Database(err)
}

/// User repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE {} ORDER BY id LIMIT 1",
            USER_COLUMNS, filter
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username = $1", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("email = $1", email).await
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username = $1 OR email = $1", identifier).await
    }

    async fn save(&self, user: &User) -> Result<Option<User>, StoreError> {
        let saved = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $1,
                email = $2,
                password_hash = $3,
                updated_at = NOW()
            WHERE id = $4
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(saved)
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
