// User lifecycle service - business logic layer

use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    auth::{middleware::AuthenticatedUser, password::PasswordService, token::TokenService},
    users::{
        error::UserError,
        models::{
            LoginRequest, LoginResponse, NewUser, RegisterRequest, UniqueField,
            UpdateUserRequest, User, UserResponse,
        },
        repository::UserRepository,
    },
};

/// Service coordinating registration, login and user maintenance
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    passwords: PasswordService,
    tokens: Arc<TokenService>,
}

impl UserService {
    /// Create a new UserService
    pub fn new(
        repository: Arc<dyn UserRepository>,
        passwords: PasswordService,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            repository,
            passwords,
            tokens,
        }
    }

    /// Register a new user
    ///
    /// This method:
    /// 1. Validates the request
    /// 2. Rejects a taken username, then a taken email
    /// 3. Hashes the password
    /// 4. Inserts the user; a duplicate key at insert time is still a conflict
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, UserError> {
        request.validate()?;

        if self.repository.find_by_username(&request.username).await?.is_some() {
            warn!("Registration rejected: username already taken");
            return Err(UserError::Conflict(UniqueField::Username));
        }
        if self.repository.find_by_email(&request.email).await?.is_some() {
            warn!("Registration rejected: email already registered");
            return Err(UserError::Conflict(UniqueField::Email));
        }

        let password_hash = self.hash_password(request.password).await?;
        let user = self
            .repository
            .create(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "User registered");
        Ok(user.into())
    }

    /// Authenticate by username or email and issue a bearer token
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, UserError> {
        request.validate()?;

        let user = match self
            .repository
            .find_by_username_or_email(&request.username)
            .await?
        {
            Some(user) => user,
            None => {
                debug!("Login failed: unknown identifier");
                return Err(UserError::InvalidCredentials);
            }
        };

        if !self.verify_password(request.password, user.password_hash.clone()).await? {
            debug!(user_id = user.id, "Login failed: wrong password");
            return Err(UserError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        info!(user_id = user.id, "User logged in");
        Ok(LoginResponse { token })
    }

    /// Fetch a user by id, without the password hash
    pub async fn get_user(&self, id: i32) -> Result<UserResponse, UserError> {
        Ok(self.require_user(id).await?.into())
    }

    /// Fetch the caller's own record
    pub async fn get_current_user(&self, caller: AuthenticatedUser) -> Result<UserResponse, UserError> {
        self.get_user(caller.user_id).await
    }

    /// Apply the supplied fields to an existing user
    ///
    /// Username and email collisions with the user's own record are ignored.
    pub async fn update_user(
        &self,
        id: i32,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, UserError> {
        request.validate()?;

        let mut user = self.require_user(id).await?;

        if let Some(username) = request.username {
            if let Some(other) = self.repository.find_by_username(&username).await? {
                if other.id != id {
                    warn!(user_id = id, "Update rejected: username already taken");
                    return Err(UserError::Conflict(UniqueField::Username));
                }
            }
            user.username = username;
        }

        if let Some(email) = request.email {
            if let Some(other) = self.repository.find_by_email(&email).await? {
                if other.id != id {
                    warn!(user_id = id, "Update rejected: email already registered");
                    return Err(UserError::Conflict(UniqueField::Email));
                }
            }
            user.email = email;
        }

        if let Some(password) = request.password {
            user.password_hash = self.hash_password(password).await?;
        }

        let saved = self
            .repository
            .save(&user)
            .await?
            .ok_or(UserError::NotFound(id))?;

        info!(user_id = id, "User updated");
        Ok(saved.into())
    }

    /// Delete a user after confirming it exists
    pub async fn delete_user(&self, id: i32) -> Result<(), UserError> {
        self.require_user(id).await?;

        if !self.repository.delete(id).await? {
            return Err(UserError::NotFound(id));
        }

        info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn require_user(&self, id: i32) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }

    // Argon2 is CPU-bound; keep it off the async worker threads
    async fn hash_password(&self, password: String) -> Result<String, UserError> {
        let passwords = self.passwords.clone();
        let hash = tokio::task::spawn_blocking(move || passwords.hash_password(&password))
            .await
            .map_err(|e| UserError::Internal(format!("password hashing task failed: {}", e)))??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, UserError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.verify_password(&password, &hash))
            .await
            .map_err(|e| UserError::Internal(format!("password verification task failed: {}", e)))
    }
}
