//! User value objects.
//!
//! # Responsibility
//! - Define the create-update record (`NewUser`) and the persisted record
//!   (`User`).
//! - Validate and normalize raw field values at construction.
//!
//! # Invariants
//! - `age` is within `[MIN_AGE, MAX_AGE]`.
//! - `name`/`surname` are non-empty, lower-cased and at most
//!   `MAX_NAME_CHARS` characters.
//! - `email` matches the address grammar, is lower-cased and at most
//!   `MAX_EMAIL_CHARS` characters.
//! - `User::id` is strictly positive.
//!
//! # See also
//! - db/migrations/0001_users.sql

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Surrogate identifier assigned by storage on insert.
pub type UserId = i64;

pub const MIN_AGE: i64 = 18;
pub const MAX_AGE: i64 = 100;
pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 100;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("valid email regex")
});

/// Field-level validation failure for user records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyName,
    EmptySurname,
    /// Raw age text could not be parsed as an integer.
    AgeNotInteger(String),
    AgeOutOfRange(i64),
    InvalidEmail(String),
    NameTooLong(usize),
    SurnameTooLong(usize),
    EmailTooLong(usize),
    NonPositiveId(UserId),
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::EmptySurname => write!(f, "surname must not be empty"),
            Self::AgeNotInteger(value) => write!(f, "age must be an integer, got `{value}`"),
            Self::AgeOutOfRange(age) => {
                write!(f, "age must be between {MIN_AGE} and {MAX_AGE}, got {age}")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::NameTooLong(len) => write!(
                f,
                "name must be at most {MAX_NAME_CHARS} characters, got {len}"
            ),
            Self::SurnameTooLong(len) => write!(
                f,
                "surname must be at most {MAX_NAME_CHARS} characters, got {len}"
            ),
            Self::EmailTooLong(len) => write!(
                f,
                "email must be at most {MAX_EMAIL_CHARS} characters, got {len}"
            ),
            Self::NonPositiveId(id) => write!(f, "id must be a positive integer, got {id}"),
        }
    }
}

impl Error for UserValidationError {}

/// Validated record used by create and update requests.
///
/// Fields are private so that a value can only exist in normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NewUserFields")]
pub struct NewUser {
    name: String,
    surname: String,
    age: i64,
    email: String,
}

impl NewUser {
    /// Validates and normalizes raw user fields.
    ///
    /// # Errors
    /// Checks run in a fixed order: name presence, surname presence, age
    /// range, email format, then length caps. The first violation is
    /// returned.
    pub fn new(
        name: impl Into<String>,
        surname: impl Into<String>,
        age: i64,
        email: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let name = name.into();
        let surname = surname.into();
        let email = email.into();

        if name.is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        if surname.is_empty() {
            return Err(UserValidationError::EmptySurname);
        }
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(UserValidationError::AgeOutOfRange(age));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(UserValidationError::InvalidEmail(email));
        }

        let name = name.to_lowercase();
        let surname = surname.to_lowercase();
        let email = email.to_lowercase();

        let name_len = name.chars().count();
        if name_len > MAX_NAME_CHARS {
            return Err(UserValidationError::NameTooLong(name_len));
        }
        let surname_len = surname.chars().count();
        if surname_len > MAX_NAME_CHARS {
            return Err(UserValidationError::SurnameTooLong(surname_len));
        }
        let email_len = email.chars().count();
        if email_len > MAX_EMAIL_CHARS {
            return Err(UserValidationError::EmailTooLong(email_len));
        }

        Ok(Self {
            name,
            surname,
            age,
            email,
        })
    }

    /// Same as [`NewUser::new`], but accepts the age as raw text.
    ///
    /// Surrounding whitespace in `age` is ignored; any other non-integer
    /// input fails with `AgeNotInteger` before the remaining checks run.
    pub fn parse(
        name: impl Into<String>,
        surname: impl Into<String>,
        age: &str,
        email: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let name = name.into();
        let surname = surname.into();
        if name.is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        if surname.is_empty() {
            return Err(UserValidationError::EmptySurname);
        }
        let age = age
            .trim()
            .parse::<i64>()
            .map_err(|_| UserValidationError::AgeNotInteger(age.to_string()))?;
        Self::new(name, surname, age, email)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn surname(&self) -> &str {
        &self.surname
    }

    pub fn age(&self) -> i64 {
        self.age
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Persisted user record with a storage-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UserFields")]
pub struct User {
    id: UserId,
    name: String,
    surname: String,
    age: i64,
    email: String,
}

impl User {
    /// Validates a full persisted record, including `id > 0`.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        surname: impl Into<String>,
        age: i64,
        email: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        let fields = NewUser::new(name, surname, age, email)?;
        Self::from_new(id, fields)
    }

    /// Attaches a storage id to an already validated record.
    pub fn from_new(id: UserId, fields: NewUser) -> Result<Self, UserValidationError> {
        if id <= 0 {
            return Err(UserValidationError::NonPositiveId(id));
        }

        let NewUser {
            name,
            surname,
            age,
            email,
        } = fields;
        Ok(Self {
            id,
            name,
            surname,
            age,
            email,
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn surname(&self) -> &str {
        &self.surname
    }

    pub fn age(&self) -> i64 {
        self.age
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Normalizes a lookup email the same way stored emails are normalized.
///
/// Lookups do not enforce the address grammar; an unknown key simply
/// yields `NotFound` downstream.
pub fn normalize_email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Deserialize)]
struct NewUserFields {
    name: String,
    surname: String,
    age: i64,
    email: String,
}

impl TryFrom<NewUserFields> for NewUser {
    type Error = UserValidationError;

    fn try_from(value: NewUserFields) -> Result<Self, Self::Error> {
        Self::new(value.name, value.surname, value.age, value.email)
    }
}

#[derive(Deserialize)]
struct UserFields {
    id: UserId,
    name: String,
    surname: String,
    age: i64,
    email: String,
}

impl TryFrom<UserFields> for User {
    type Error = UserValidationError;

    fn try_from(value: UserFields) -> Result<Self, Self::Error> {
        Self::new(value.id, value.name, value.surname, value.age, value.email)
    }
}
