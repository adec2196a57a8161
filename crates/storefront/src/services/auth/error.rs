//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// The display strings are shown to the visitor on the auth screens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("Please enter a valid email address")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// User already exists.
    #[error("An account with this email already exists")]
    UserAlreadyExists,

    /// Invalid credentials (wrong password or user not found).
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Logged-in user no longer exists in the store.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the visitor can fix this by changing their input.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
