//! Workspace sandbox for the file tools.
//!
//! Paths are resolved against the workspace root and normalized before the
//! containment check, so `a/../../b` is caught even when nothing on disk
//! exists yet. Existing prefixes are canonicalized to see through symlinks.

use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("path '{path}' is outside the workspace")]
    OutsideWorkspace { path: String },

    #[error("failed to resolve path '{path}': {reason}")]
    Unresolvable { path: String, reason: String },
}

/// Where file tools may read and write.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    enforce: bool,
}

impl Sandbox {
    /// Confine file access to `root`.
    pub fn confined(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root, enforce: true }
    }

    /// Resolve relative paths against `root` without any containment check.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            enforce: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_enforced(&self) -> bool {
        self.enforce
    }

    /// Resolve `path` to an absolute location, rejecting anything that
    /// escapes the root when confined.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SandboxError> {
        let raw = Path::new(path.trim());
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.root.join(raw)
        };
        let normalized = normalize(&joined);

        if !self.enforce {
            return Ok(normalized);
        }

        let resolved = canonicalize_existing(&normalized).map_err(|e| SandboxError::Unresolvable {
            path: path.into(),
            reason: e.to_string(),
        })?;
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(SandboxError::OutsideWorkspace { path: path.into() })
        }
    }
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor and re-attach the rest.
fn canonicalize_existing(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path;
    let mut tail = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }
    let mut resolved = existing.canonicalize()?;
    for name in tail.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
