// Authentication module
// Password hashing, JWT issuance/validation and the bearer-token gate for protected routes

pub mod error;
pub mod middleware;
pub mod password;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::{authorize, require_auth, AuthenticatedUser};
pub use password::{PasswordError, PasswordService};
pub use token::{Claims, JwtSecret, TokenError, TokenService};
