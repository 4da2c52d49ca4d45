//! # Auth Errors
//!
//! Error types for the authentication module.

use thiserror::Error;

use crate::errors::VaultError;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Signup and login errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown user or wrong password (generic - don't leak which)
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Unknown role: {0}")]
    InvalidRole(String),

    /// Password does not meet requirements
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// A stored account could not be decoded
    #[error("Corrupted user record: {0}")]
    CorruptedRecord(String),

    /// User repository operation failed
    #[error("Storage error: {0}")]
    Storage(VaultError),
}

impl From<AuthError> for VaultError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => VaultError::AuthenticationFailure,
            AuthError::UsernameTaken(username) => VaultError::AlreadyExists(username),
            AuthError::InvalidUsername(_)
            | AuthError::InvalidRole(_)
            | AuthError::WeakPassword(_) => VaultError::InvalidInput(err.to_string()),
            AuthError::HashingFailed => VaultError::StorageUnavailable {
                op: "hash_password",
                target: "users".to_string(),
                reason: "password hashing failed".to_string(),
            },
            AuthError::CorruptedRecord(username) => {
                VaultError::corrupted(format!("users/{}", username), "undecodable user record")
            }
            AuthError::Storage(inner) => inner,
        }
    }
}
