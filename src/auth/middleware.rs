// Authorization gate for protected routes

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{error::AuthError, token::TokenService};

const BEARER_SCHEME: &str = "Bearer";

/// Identity resolved by the gate, stored as a typed request extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i32,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AuthError::MissingIdentity)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Resolve the caller's identity from request headers
pub fn authorize(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;

    let claims = tokens.validate(token).map_err(|e| {
        debug!("Token validation failed: {}", e);
        AuthError::InvalidOrExpiredToken
    })?;

    Ok(AuthenticatedUser {
        user_id: claims.user_id,
    })
}

/// Middleware that admits a request only with a valid bearer token
///
/// On success the caller's `AuthenticatedUser` is attached to the request
/// before it reaches the handler.
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authorize(&tokens, request.headers()).map_err(|e| {
        warn!("Rejected request to {}: {}", request.uri().path(), e);
        e
    })?;

    debug!(user_id = user.user_id, "Request authorized");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
