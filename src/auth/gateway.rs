//! # Auth Gateway
//!
//! Signup, login and session issue. A successful signup provisions the
//! user's sandbox root; a successful login yields a `Session` positioned
//! at that root.

use std::sync::Arc;

use tracing::{info, warn};

use super::crypto::PasswordPolicy;
use super::errors::AuthError;
use super::user::{Role, User, UserRepository};
use crate::errors::{VaultError, VaultResult};
use crate::file_storage::FileSystem;
use crate::sandbox::SandboxRoot;
use crate::session::Session;

#[derive(Debug)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    filesystem: Arc<FileSystem>,
    policy: PasswordPolicy,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, filesystem: Arc<FileSystem>) -> Self {
        Self {
            users,
            filesystem,
            policy: PasswordPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a user and create their sandbox root
    pub fn signup(&self, username: &str, password: &str, role: Role) -> VaultResult<()> {
        let user = User::new(username, password, role, &self.policy)?;
        self.users.create(&user)?;

        let root = SandboxRoot::new(username)?;
        if let Err(e) = self.filesystem.provision_root(&root) {
            // Don't leave an account without a home
            if let Err(cleanup) = self.users.delete(username) {
                warn!(username, error = %cleanup, "failed to remove account after provisioning error");
            }
            return Err(e);
        }

        info!(username, role = %role, "user signed up");
        Ok(())
    }

    /// Check credentials. Unknown users and wrong passwords both yield `false`.
    pub fn login(&self, username: &str, password: &str) -> VaultResult<bool> {
        let Some(user) = self.users.find(username)? else {
            warn!(username, "login for unknown user");
            return Ok(false);
        };

        let authorized = match user.verify_password(password) {
            Ok(ok) => ok,
            Err(AuthError::InvalidCredentials) => false,
            Err(e) => return Err(e.into()),
        };

        if authorized {
            info!(username, "login succeeded");
        } else {
            warn!(username, "login failed");
        }
        Ok(authorized)
    }

    /// Log in and open a session at the user's sandbox root
    pub fn open_session(&self, username: &str, password: &str) -> VaultResult<Session> {
        if !self.login(username, password)? {
            return Err(VaultError::AuthenticationFailure);
        }

        let root = SandboxRoot::new(username)?;
        self.filesystem.provision_root(&root)?;

        let session = Session::new(username, root);
        info!(username, session = %session.id(), "opened session");
        Ok(session)
    }

    /// Role of a registered user
    pub fn role(&self, username: &str) -> VaultResult<Option<Role>> {
        Ok(self.users.find(username)?.map(|user| user.role))
    }
}
