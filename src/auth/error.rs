// Authorization gate error types

use axum::response::{IntoResponse, Response};
use std::fmt;

use crate::error::ApiError;

/// Rejections produced by the authorization gate
///
/// Token validation failures all collapse into `InvalidOrExpiredToken` so a
/// client cannot tell a bad signature from an expired or malformed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    MalformedHeader,
    InvalidOrExpiredToken,
    /// A handler asked for the caller's identity on a route the gate does not cover
    MissingIdentity,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::MalformedHeader => write!(f, "Invalid authorization header format"),
            AuthError::InvalidOrExpiredToken => write!(f, "Invalid or expired token"),
            AuthError::MissingIdentity => write!(f, "Authenticated user missing from request context"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingIdentity => ApiError::InternalError(err.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
