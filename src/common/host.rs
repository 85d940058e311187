use std::path::{Path, PathBuf};

use super::command::CommandRunner;
use crate::users::LocalUser;

/// Everything a walk needs to know about the machine it runs on.
///
/// System-scope paths are resolved against `system_root`, which is `/` on a
/// real Mac.
pub struct Host<'a> {
    pub runner: &'a dyn CommandRunner,
    pub users: Vec<LocalUser>,
    pub system_root: PathBuf,
    /// Paths this run writes to; never reported and never deleted
    pub keep: Vec<PathBuf>,
}

impl<'a> Host<'a> {
    pub fn new(runner: &'a dyn CommandRunner, users: Vec<LocalUser>) -> Self {
        Self {
            runner,
            users,
            system_root: PathBuf::from("/"),
            keep: Vec::new(),
        }
    }

    pub fn with_system_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.system_root = root.into();
        self
    }

    /// Keep `path` (and its canonical form) out of every sweep and deletion
    pub fn with_kept_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Ok(canonical) = path.canonicalize() {
            if canonical != path {
                self.keep.push(canonical);
            }
        }
        self.keep.push(path);
        self
    }

    /// Whether `path` is a kept path or lies inside one
    pub fn is_kept(&self, path: &Path) -> bool {
        self.keep.iter().any(|k| is_within(path, k))
    }

    /// Resolve an absolute system path against the system root
    pub fn system_path(&self, abs: &str) -> PathBuf {
        self.system_root.join(abs.trim_start_matches('/'))
    }

    /// Resolve a catalogue path: `~/...` is per user, anything else is system
    pub fn resolve(&self, path: &str, user: Option<&LocalUser>) -> Option<PathBuf> {
        if path.starts_with("~/") {
            user.map(|u| u.home_path(path))
        } else {
            Some(self.system_path(path))
        }
    }

    /// Home directories of all local users
    pub fn homes(&self) -> Vec<&Path> {
        self.users.iter().map(|u| u.home.as_path()).collect()
    }
}

/// Case-folded component-wise `path.starts_with(ancestor)`
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    let path = path.to_string_lossy().to_lowercase();
    let ancestor = ancestor.to_string_lossy().to_lowercase();
    Path::new(&path).starts_with(Path::new(&ancestor))
}
