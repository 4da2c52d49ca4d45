//! # User Management
//!
//! User model and repositories. Accounts are keyed by username, which is
//! also the name of the user's sandbox root.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::crypto::{hash_password, verify_password, PasswordPolicy};
use super::errors::{AuthError, AuthResult};
use crate::metadata::{MetadataError, MetadataStore, USER_COLLECTION};
use crate::sandbox::SandboxRoot;

/// Account role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(AuthError::InvalidRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// User model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique username, also the sandbox root name
    pub username: String,

    /// Argon2id password hash (never plaintext)
    pub password_hash: String,

    pub role: Role,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with the given username and password
    pub fn new(username: &str, password: &str, role: Role, policy: &PasswordPolicy) -> AuthResult<Self> {
        validate_username(username)?;
        policy.validate(password)?;

        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            role,
            created_at: Utc::now(),
        })
    }

    /// Verify a password against this user's stored hash
    pub fn verify_password(&self, password: &str) -> AuthResult<bool> {
        verify_password(password, &self.password_hash)
    }
}

/// Usernames must be usable as a sandbox root name
pub fn validate_username(username: &str) -> AuthResult<()> {
    SandboxRoot::new(username)
        .map(|_| ())
        .map_err(|_| AuthError::InvalidUsername(username.to_string()))
}

/// User repository trait
///
/// Abstracts storage operations for users.
pub trait UserRepository: Send + Sync + fmt::Debug {
    fn find(&self, username: &str) -> AuthResult<Option<User>>;

    /// Create a new user, failing if the username is taken
    fn create(&self, user: &User) -> AuthResult<()>;

    /// Delete a user, returning whether it existed
    fn delete(&self, username: &str) -> AuthResult<bool>;
}

/// In-memory user repository for testing
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> AuthError {
    AuthError::Storage(crate::errors::VaultError::StorageUnavailable {
        op: "users",
        target: USER_COLLECTION.to_string(),
        reason: "Lock poisoned".to_string(),
    })
}

impl UserRepository for InMemoryUserRepository {
    fn find(&self, username: &str) -> AuthResult<Option<User>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(username).cloned())
    }

    fn create(&self, user: &User) -> AuthResult<()> {
        let mut users = self.users.write().map_err(poisoned)?;

        if users.contains_key(&user.username) {
            return Err(AuthError::UsernameTaken(user.username.clone()));
        }

        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    fn delete(&self, username: &str) -> AuthResult<bool> {
        let mut users = self.users.write().map_err(poisoned)?;
        Ok(users.remove(username).is_some())
    }
}

/// User repository stored in the `users` collection of a metadata store
#[derive(Debug)]
pub struct MetadataUserRepository {
    store: Arc<dyn MetadataStore>,
}

impl MetadataUserRepository {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }
}

impl UserRepository for MetadataUserRepository {
    fn find(&self, username: &str) -> AuthResult<Option<User>> {
        let document = self
            .store
            .find_document(USER_COLLECTION, username)
            .map_err(|e| AuthError::Storage(e.into_vault("find_user", username)))?;

        document
            .map(|doc| {
                serde_json::from_value(doc)
                    .map_err(|_| AuthError::CorruptedRecord(username.to_string()))
            })
            .transpose()
    }

    fn create(&self, user: &User) -> AuthResult<()> {
        let document = serde_json::to_value(user)
            .map_err(|_| AuthError::CorruptedRecord(user.username.clone()))?;

        match self.store.insert_document(USER_COLLECTION, &user.username, document) {
            Ok(()) => Ok(()),
            Err(MetadataError::DuplicateDocument { .. }) => {
                Err(AuthError::UsernameTaken(user.username.clone()))
            }
            Err(e) => Err(AuthError::Storage(e.into_vault("create_user", &user.username))),
        }
    }

    fn delete(&self, username: &str) -> AuthResult<bool> {
        self.store
            .delete_document(USER_COLLECTION, username)
            .map_err(|e| AuthError::Storage(e.into_vault("delete_user", username)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryMetadataStore;

    fn policy() -> PasswordPolicy {
        PasswordPolicy::default()
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("User".parse::<Role>().unwrap(), Role::User);
        assert!(matches!("root".parse::<Role>(), Err(AuthError::InvalidRole(_))));
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_usernames_must_be_root_names() {
        assert!(User::new("alice", "password123", Role::User, &policy()).is_ok());
        for bad in ["", "..", "a/b"] {
            assert!(matches!(
                User::new(bad, "password123", Role::User, &policy()),
                Err(AuthError::InvalidUsername(_))
            ));
        }
    }

    #[test]
    fn test_in_memory_repository() {
        let repo = InMemoryUserRepository::new();
        let user = User::new("alice", "password123", Role::User, &policy()).unwrap();

        repo.create(&user).unwrap();
        assert_eq!(repo.find("alice").unwrap(), Some(user.clone()));
        assert!(matches!(repo.create(&user), Err(AuthError::UsernameTaken(_))));

        assert!(repo.delete("alice").unwrap());
        assert_eq!(repo.find("alice").unwrap(), None);
    }

    #[test]
    fn test_metadata_repository_persists_hash() {
        let store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let repo = MetadataUserRepository::new(Arc::clone(&store));
        let user = User::new("bob", "password123", Role::Admin, &policy()).unwrap();

        repo.create(&user).unwrap();
        let found = repo.find("bob").unwrap().unwrap();
        assert_eq!(found.role, Role::Admin);
        assert!(found.verify_password("password123").unwrap());

        let raw = store.find_document(USER_COLLECTION, "bob").unwrap().unwrap();
        assert_eq!(raw["role"], "admin");
        assert_ne!(raw["password_hash"], "password123");

        assert!(matches!(repo.create(&user), Err(AuthError::UsernameTaken(_))));
    }
}
