//! # Sandbox
//!
//! Lexical path resolution against a per-user sandbox root.
//!
//! ## Invariants
//!
//! - A resolved path is always a component-wise descendant of (or equal
//!   to) the sandbox root
//! - A `..` that would climb above the root fails with `PermissionDenied`,
//!   even if later components would descend again
//! - Absolute requests are re-rooted at the sandbox root
//!
//! Resolution never consults the filesystem; symlink containment is
//! enforced separately by the storage backend.

use std::fmt;

use crate::errors::{VaultError, VaultResult};

/// A user's sandbox root, named by a single path component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandboxRoot {
    name: String,
}

impl SandboxRoot {
    pub fn new(name: impl Into<String>) -> VaultResult<Self> {
        let name = name.into();
        validate_component(&name)?;
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage key addressing `path` inside this root
    pub fn storage_key(&self, path: &SandboxPath) -> String {
        if path.is_root() {
            self.name.clone()
        } else {
            format!("{}/{}", self.name, path.components.join("/"))
        }
    }

    /// Resolve `requested` relative to `cwd` inside this root
    pub fn resolve(&self, cwd: &SandboxPath, requested: &str) -> VaultResult<SandboxPath> {
        let mut components = if requested.starts_with('/') {
            Vec::new()
        } else {
            cwd.components.clone()
        };

        for component in requested.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    if components.pop().is_none() {
                        return Err(VaultError::PermissionDenied(format!(
                            "'{}' escapes the sandbox root",
                            requested
                        )));
                    }
                }
                name => {
                    validate_component(name)?;
                    components.push(name.to_string());
                }
            }
        }

        Ok(SandboxPath { components })
    }
}

/// Resolve `requested` against the sandbox root itself
pub fn resolve_path(root: &SandboxRoot, requested: &str) -> VaultResult<SandboxPath> {
    root.resolve(&SandboxPath::root(), requested)
}

/// A normalised path relative to a sandbox root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SandboxPath {
    components: Vec<String>,
}

impl SandboxPath {
    /// The sandbox root itself
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Last component, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<SandboxPath> {
        if self.is_root() {
            return None;
        }
        Some(SandboxPath {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// Whether `self` equals `other` or lies beneath it
    pub fn starts_with(&self, other: &SandboxPath) -> bool {
        self.components.starts_with(&other.components)
    }
}

impl fmt::Display for SandboxPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.components.join("/"))
    }
}

fn validate_component(name: &str) -> VaultResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(VaultError::InvalidInput(format!(
            "'{}' is not a valid name",
            name
        )));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(VaultError::InvalidInput(format!(
            "name '{}' contains a reserved character",
            name.escape_default()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> SandboxRoot {
        SandboxRoot::new("alice").unwrap()
    }

    #[test]
    fn test_plain_names_resolve_under_root() {
        let root = alice();
        let path = resolve_path(&root, "docs/notes.txt").unwrap();

        assert_eq!(path.to_string(), "/docs/notes.txt");
        assert_eq!(root.storage_key(&path), "alice/docs/notes.txt");
        assert_eq!(path.file_name(), Some("notes.txt"));
    }

    #[test]
    fn test_dots_are_normalised() {
        let root = alice();
        let path = resolve_path(&root, "./docs/../docs/./a.txt").unwrap();
        assert_eq!(root.storage_key(&path), "alice/docs/a.txt");
    }

    #[test]
    fn test_escape_is_denied() {
        let root = alice();
        assert!(matches!(
            resolve_path(&root, "../bob/secret.txt"),
            Err(VaultError::PermissionDenied(_))
        ));
        // Climbing out and back in is still an escape
        assert!(matches!(
            resolve_path(&root, "../alice/a.txt"),
            Err(VaultError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_absolute_requests_are_rerooted() {
        let root = alice();
        let cwd = resolve_path(&root, "docs").unwrap();

        let path = root.resolve(&cwd, "/etc/passwd").unwrap();
        assert_eq!(root.storage_key(&path), "alice/etc/passwd");
    }

    #[test]
    fn test_relative_to_cwd() {
        let root = alice();
        let cwd = resolve_path(&root, "docs/2024").unwrap();

        assert_eq!(root.resolve(&cwd, "../a.txt").unwrap().to_string(), "/docs/a.txt");
        assert_eq!(root.resolve(&cwd, "../..").unwrap(), SandboxPath::root());
        assert!(matches!(
            root.resolve(&cwd, "../../.."),
            Err(VaultError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_root_names_are_single_components() {
        assert!(SandboxRoot::new("alice").is_ok());
        assert!(SandboxRoot::new("").is_err());
        assert!(SandboxRoot::new("..").is_err());
        assert!(SandboxRoot::new("a/b").is_err());
    }

    #[test]
    fn test_parent_and_prefix() {
        let root = alice();
        let path = resolve_path(&root, "a/b/c").unwrap();
        let parent = path.parent().unwrap();

        assert_eq!(parent.to_string(), "/a/b");
        assert!(path.starts_with(&parent));
        assert!(!parent.starts_with(&path));
        assert_eq!(SandboxPath::root().parent(), None);
        assert_eq!(SandboxPath::root().to_string(), "/");
    }
}
