//! # Session
//!
//! Explicit per-user context: the authenticated username, the sandbox
//! root and the current working directory. Sessions are owned by one
//! caller and passed by reference to every filesystem operation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::sandbox::{SandboxPath, SandboxRoot};

/// An authenticated user's working context
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    username: String,
    root: SandboxRoot,
    cwd: SandboxPath,
    opened_at: DateTime<Utc>,
}

impl Session {
    /// Open a session positioned at the sandbox root
    pub fn new(username: impl Into<String>, root: SandboxRoot) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            root,
            cwd: SandboxPath::root(),
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn root(&self) -> &SandboxRoot {
        &self.root
    }

    pub fn cwd(&self) -> &SandboxPath {
        &self.cwd
    }

    /// Current directory as shown to the user, e.g. `/docs`
    pub fn current_dir(&self) -> String {
        self.cwd.to_string()
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Directory existence is checked by the filesystem before this is called
    pub(crate) fn set_cwd(&mut self, cwd: SandboxPath) {
        self.cwd = cwd;
    }
}
