//! Core domain logic for the user directory.
//! This crate is the single source of truth for user record invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{ensure_schema, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, LoggingError};
pub use model::user::{
    normalize_email_key, NewUser, User, UserId, UserValidationError, MAX_AGE, MAX_EMAIL_CHARS,
    MAX_NAME_CHARS, MIN_AGE,
};
pub use repo::user_repo::{RepoError, RepoResult, SqliteUserRepository, UserRepository};
pub use service::user_service::{UserInput, UserService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
