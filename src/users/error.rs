// Error types for the user lifecycle service

use thiserror::Error;

use crate::{
    auth::{password::PasswordError, token::TokenError},
    error::ApiError,
    users::models::UniqueField,
};

/// Credential store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write hit the unique constraint on username or email
    #[error("duplicate {0}")]
    UniqueViolation(UniqueField),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Service-level errors for user operations
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0} already in use")]
    Conflict(UniqueField),

    #[error("User {0} not found")]
    NotFound(i32),

    /// Unknown identifier and wrong password are deliberately indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(field) => UserError::Conflict(field),
            StoreError::Database(e) => UserError::Database(e),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(errors) => ApiError::ValidationError(errors),
            UserError::Conflict(UniqueField::Username) => ApiError::Conflict {
                message: "Username already exists".to_string(),
            },
            UserError::Conflict(UniqueField::Email) => ApiError::Conflict {
                message: "Email already registered".to_string(),
            },
            UserError::NotFound(id) => ApiError::NotFound {
                resource: "User".to_string(),
                id: id.to_string(),
            },
            UserError::InvalidCredentials => ApiError::Unauthorized("Invalid credentials".to_string()),
            UserError::Database(e) => ApiError::DatabaseError(e),
            other @ (UserError::Password(_) | UserError::Token(_) | UserError::Internal(_)) => {
                ApiError::InternalError(other.to_string())
            }
        }
    }
}
