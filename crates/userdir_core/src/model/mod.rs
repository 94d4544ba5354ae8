//! Validated value objects for the user directory.
//!
//! # Responsibility
//! - Define canonical user records shared by repository and service layers.
//! - Keep validation pure (no I/O) so callers can re-prompt on failure.
//!
//! # Invariants
//! - A `NewUser` or `User` value only exists in validated, normalized form.
//!
//! # See also
//! - db/migrations/0001_users.sql

pub mod user;
