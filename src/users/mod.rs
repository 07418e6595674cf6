// User lifecycle module
// Registration, login and maintenance of user records behind a pluggable credential store

pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{StoreError, UserError};
pub use handlers::*;
pub use memory::InMemoryUserRepository;
pub use models::*;
pub use repository::{PgUserRepository, UserRepository};
pub use service::UserService;
