//! # Auth Module
//!
//! User signup and login with Argon2id password hashes. Each user owns a
//! sandbox root named after their username.

pub mod crypto;
pub mod errors;
pub mod gateway;
pub mod user;

pub use crypto::{hash_password, verify_password, PasswordPolicy};
pub use errors::{AuthError, AuthResult};
pub use gateway::AuthService;
pub use user::{InMemoryUserRepository, MetadataUserRepository, Role, User, UserRepository};
