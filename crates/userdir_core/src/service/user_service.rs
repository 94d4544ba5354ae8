//! User use-case service.
//!
//! # Responsibility
//! - Turn raw text collected by a shell into validated records.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository contracts.
//! - Service layer remains storage-agnostic and never touches a terminal.

use crate::model::user::{normalize_email_key, NewUser, User};
use crate::repo::user_repo::{RepoResult, UserRepository};

/// Raw user fields as typed by an operator.
///
/// Trimming is the caller's job; the service passes text through unchanged
/// except for the email lookup key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInput {
    pub name: String,
    pub surname: String,
    /// Age as raw text, parsed during validation.
    pub age: String,
    pub email: String,
}

impl UserInput {
    /// Validates raw input into a create-update record.
    pub fn to_new_user(&self) -> RepoResult<NewUser> {
        Ok(NewUser::parse(
            self.name.as_str(),
            self.surname.as_str(),
            self.age.as_str(),
            self.email.as_str(),
        )?)
    }
}

/// Use-case service wrapper for user CRUD operations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates raw input and inserts a new user.
    pub fn create_user(&self, input: &UserInput) -> RepoResult<User> {
        let user = input.to_new_user()?;
        self.repo.add_user(&user)
    }

    /// Gets one user; the email is normalized before lookup.
    pub fn get_user(&self, email: &str) -> RepoResult<User> {
        self.repo.get_user_by_email(&normalize_email_key(email))
    }

    pub fn list_users(&self) -> RepoResult<Vec<User>> {
        self.repo.list_users()
    }

    /// Validates raw input and replaces name/surname/age of the user with
    /// the same email.
    pub fn update_user(&self, input: &UserInput) -> RepoResult<User> {
        let user = input.to_new_user()?;
        self.repo.update_user(&user)?;
        self.repo.get_user_by_email(user.email())
    }

    pub fn delete_user(&self, email: &str) -> RepoResult<()> {
        self.repo.delete_user_by_email(&normalize_email_key(email))
    }

    /// Returns the number of removed users.
    pub fn delete_all_users(&self) -> RepoResult<usize> {
        self.repo.delete_all_users()
    }
}
