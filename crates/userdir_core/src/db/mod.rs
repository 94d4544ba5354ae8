//! SQLite storage bootstrap and schema entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the user directory.
//! - Ensure the `users` table exists before any repository call.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write user rows before the schema is ensured.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use migrations::ensure_schema;
pub use open::{connect, open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or preparing the user store.
#[derive(Debug)]
pub enum DbError {
    /// SQLite itself refused the operation.
    Storage(rusqlite::Error),
    /// The file carries a `user_version` this binary does not know.
    SchemaTooNew { found: u32, supported: u32 },
    /// `connect` was pointed at a file that does not exist.
    MissingStore(PathBuf),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "user store error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "user store uses schema v{found} but this build only knows up to v{supported}; upgrade userdir"
            ),
            Self::MissingStore(path) => write!(
                f,
                "no user store at {}; open it with schema setup first",
                path.display()
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value)
    }
}
