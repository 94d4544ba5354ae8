//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the canonical `users` table.
//! - Translate storage constraint violations and absence into domain errors.
//!
//! # Invariants
//! - Every call opens its own connection and transaction; nothing is shared
//!   between calls.
//! - Update/delete with zero affected rows is `NotFound`, never a silent
//!   success.
//! - Writes take `NewUser`, which only the validating constructors (and its
//!   serde `try_from`) can build, so no second check runs before SQL.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - Log events carry ids and counts only, never emails or names.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{connect, DbError};
use crate::model::user::{NewUser, User, UserValidationError};
use log::{debug, info};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const USER_SELECT_SQL: &str = "SELECT id, email, name, surname, age FROM users";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input violates a field-level invariant.
    Validation(UserValidationError),
    /// No row matches the given email.
    NotFound(String),
    /// A row with the given email already exists.
    DuplicateKey(String),
    /// Storage rejected a write through a CHECK/NOT NULL constraint.
    Constraint(String),
    /// A stored row violates record invariants.
    InvalidData(String),
    /// Database file has not been initialized with the current schema.
    UninitializedStore {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(email) => write!(f, "user with email {email} not found"),
            Self::DuplicateKey(email) => write!(f, "user with email {email} already exists"),
            Self::Constraint(message) => write!(f, "{message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
            Self::UninitializedStore {
                expected_version,
                actual_version,
            } => write!(
                f,
                "user store schema version {actual_version} does not match expected {expected_version}; run schema setup first"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Storage(value))
    }
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    /// Inserts a new user and returns it with the storage-assigned id.
    fn add_user(&self, user: &NewUser) -> RepoResult<User>;
    /// Looks up one user by normalized email.
    fn get_user_by_email(&self, email: &str) -> RepoResult<User>;
    /// Returns every user in storage order; empty when the table is empty.
    fn list_users(&self) -> RepoResult<Vec<User>>;
    /// Replaces name/surname/age of the user identified by `user.email()`.
    fn update_user(&self, user: &NewUser) -> RepoResult<()>;
    fn delete_user_by_email(&self, email: &str) -> RepoResult<()>;
    /// Deletes all users and returns how many rows were removed.
    fn delete_all_users(&self) -> RepoResult<usize>;
}

/// SQLite-backed user repository.
///
/// Holds only the database location; connections are scoped to each call.
#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    db_path: PathBuf,
}

impl SqliteUserRepository {
    /// Constructs a repository for a database whose schema is already ensured.
    ///
    /// # Errors
    /// - `UninitializedStore` when `PRAGMA user_version` is not current.
    /// - `MissingRequiredTable` when the `users` table is absent.
    pub fn try_new(db_path: impl Into<PathBuf>) -> RepoResult<Self> {
        let db_path = db_path.into();
        let conn = connect(&db_path)?;
        ensure_store_ready(&conn)?;
        Ok(Self { db_path })
    }

    fn connect(&self) -> RepoResult<Connection> {
        Ok(connect(&self.db_path)?)
    }
}

impl UserRepository for SqliteUserRepository {
    fn add_user(&self, user: &NewUser) -> RepoResult<User> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO users (email, name, surname, age) VALUES (?1, ?2, ?3, ?4);",
            params![user.email(), user.name(), user.surname(), user.age()],
        )
        .map_err(|err| map_write_error(err, user.email(), "add"))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!("event=user_add module=repo status=ok id={id}");
        Ok(User::from_new(id, user.clone())?)
    }

    fn get_user_by_email(&self, email: &str) -> RepoResult<User> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;

        let user = stmt
            .query_row([email], |row| Ok(parse_user_row(row)))
            .optional()?;

        match user {
            Some(user) => user,
            None => Err(RepoError::NotFound(email.to_string())),
        }
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();

        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        debug!("event=user_list module=repo status=ok count={}", users.len());
        Ok(users)
    }

    fn update_user(&self, user: &NewUser) -> RepoResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let changed = tx
            .execute(
                "UPDATE users SET name = ?1, surname = ?2, age = ?3 WHERE email = ?4;",
                params![user.name(), user.surname(), user.age(), user.email()],
            )
            .map_err(|err| map_write_error(err, user.email(), "update"))?;

        if changed == 0 {
            return Err(RepoError::NotFound(user.email().to_string()));
        }

        tx.commit()?;
        info!("event=user_update module=repo status=ok changed={changed}");
        Ok(())
    }

    fn delete_user_by_email(&self, email: &str) -> RepoResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let changed = tx.execute("DELETE FROM users WHERE email = ?1;", [email])?;
        if changed == 0 {
            return Err(RepoError::NotFound(email.to_string()));
        }

        tx.commit()?;
        info!("event=user_delete module=repo status=ok changed={changed}");
        Ok(())
    }

    fn delete_all_users(&self) -> RepoResult<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let changed = tx.execute("DELETE FROM users;", [])?;
        tx.commit()?;

        info!("event=user_delete_all module=repo status=ok changed={changed}");
        Ok(changed)
    }
}

fn ensure_store_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_user_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedStore {
            expected_version,
            actual_version,
        });
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'users');",
        [],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(RepoError::MissingRequiredTable("users"));
    }

    Ok(())
}

fn map_write_error(err: rusqlite::Error, email: &str, action: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE {
                return RepoError::DuplicateKey(email.to_string());
            }
            let detail = message.as_deref().unwrap_or("constraint violation");
            return RepoError::Constraint(format!("failed to {action} user: {detail}"));
        }
    }
    err.into()
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: i64 = row.get("id")?;
    let email: String = row.get("email")?;
    let name: String = row.get("name")?;
    let surname: String = row.get("surname")?;
    let age: i64 = row.get("age")?;

    User::new(id, name, surname, age, email)
        .map_err(|err| RepoError::InvalidData(format!("row id {id}: {err}")))
}
