//! # Password Hashing
//!
//! Passwords are only ever stored as Argon2id PHC strings. Verification
//! goes through the argon2 crate, which compares in constant time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::errors::{AuthError, AuthResult};

/// Password requirements configuration
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// Upper bound keeps hashing cost bounded
    pub max_length: usize,
    pub require_letter: bool,
    pub require_number: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 1024,
            require_letter: false,
            require_number: false,
        }
    }
}

impl PasswordPolicy {
    /// Validate a password against this policy
    pub fn validate(&self, password: &str) -> AuthResult<()> {
        let length = password.chars().count();

        if length < self.min_length {
            return Err(AuthError::WeakPassword(format!(
                "Password must be at least {} characters",
                self.min_length
            )));
        }

        if length > self.max_length {
            return Err(AuthError::WeakPassword(format!(
                "Password must be at most {} characters",
                self.max_length
            )));
        }

        if self.require_letter && !password.chars().any(char::is_alphabetic) {
            return Err(AuthError::WeakPassword(
                "Password must contain at least one letter".to_string(),
            ));
        }

        if self.require_number && !password.chars().any(char::is_numeric) {
            return Err(AuthError::WeakPassword(
                "Password must contain at least one number".to_string(),
            ));
        }

        Ok(())
    }
}

/// Hash a password using Argon2id with a fresh salt
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingFailed)
}

/// Verify a password against its stored hash
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = "secure_password_123";
        let hash = hash_password(password).unwrap();

        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2id$"));

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hash1 = hash_password("same_password").unwrap();
        let hash2 = hash_password("same_password").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("same_password", &hash1).unwrap());
        assert!(verify_password("same_password", &hash2).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_invalid_credentials() {
        assert_eq!(
            verify_password("pw", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_password_policy() {
        let policy = PasswordPolicy {
            require_letter: true,
            require_number: true,
            ..Default::default()
        };

        // Too short
        assert!(policy.validate("ab1").is_err());

        // Missing number
        assert!(policy.validate("abcdefgh").is_err());

        // Missing letter
        assert!(policy.validate("12345678").is_err());

        assert!(policy.validate("abcdefg1").is_ok());
        assert!(PasswordPolicy::default().validate(&"x".repeat(2000)).is_err());
    }
}
