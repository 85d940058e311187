use std::path::{Path, PathBuf};

use super::errors::PurgeError;
use super::host::is_within;
use super::permissions;

/// Paths that must NEVER be deleted under any circumstances.
/// This is a critical safety net against bugs in catalogue entries.
const PROTECTED_PATHS: &[&str] = &[
    "/",
    "/System",
    "/Applications",
    "/Users",
    "/Library",
    "/Library/Application Support",
    "/Library/Caches",
    "/Library/LaunchAgents",
    "/Library/LaunchDaemons",
    "/Library/Logs",
    "/Library/Preferences",
    "/usr",
    "/usr/local",
    "/usr/local/bin",
    "/usr/local/lib",
    "/opt",
    "/opt/homebrew",
    "/bin",
    "/sbin",
    "/var",
    "/etc",
    "/private",
    "/tmp",
    "/Volumes",
];

/// Paths under a home directory that must never be deleted entirely
const PROTECTED_HOME_DIRS: &[&str] = &[
    "",
    "Desktop",
    "Documents",
    "Downloads",
    "Applications",
    "Library",
    "Library/Application Support",
    "Library/Caches",
    "Library/Containers",
    "Library/Group Containers",
    "Library/LaunchAgents",
    "Library/Logs",
    "Library/Preferences",
    ".ssh",
    ".local",
    ".local/bin",
    ".npm-global",
];

/// Check if a path is protected and should NEVER be deleted.
///
/// `homes` are the home directories of the users being processed. `keep`
/// paths and every directory above them are protected too.
pub fn is_protected(path: &Path, homes: &[&Path], keep: &[PathBuf]) -> bool {
    if keep.iter().any(|k| is_within(k, path)) {
        return true;
    }

    let path_str = path.to_string_lossy();
    let path_str = path_str.trim_end_matches('/');
    let path_str = if path_str.is_empty() { "/" } else { path_str };

    if PROTECTED_PATHS.iter().any(|p| path_str == *p) {
        return true;
    }

    homes.iter().any(|home| {
        PROTECTED_HOME_DIRS.iter().any(|dir| {
            let protected = if dir.is_empty() {
                home.to_path_buf()
            } else {
                home.join(dir)
            };
            path_str == protected.to_string_lossy().trim_end_matches('/')
        })
    })
}

/// Remove a file, symlink or directory tree.
///
/// Returns `Ok(false)` when nothing was there: removal is idempotent.
pub fn remove_path(path: &Path, homes: &[&Path], keep: &[PathBuf]) -> Result<bool, PurgeError> {
    if is_protected(path, homes, keep) {
        return Err(PurgeError::ProtectedPath {
            path: path.to_path_buf(),
        });
    }
    if permissions::is_sip_protected(path) {
        return Err(PurgeError::SipProtected {
            path: path.to_path_buf(),
        });
    }

    // symlink_metadata so dangling links are still seen and never followed
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(PurgeError::io(path, e)),
    };

    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PurgeError::io(path, e)),
    }
}

/// Whether anything (including a dangling symlink) exists at `path`
pub fn entry_exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// Total on-disk size of a path, used for the removal report
pub fn path_size(path: &Path) -> u64 {
    match std::fs::symlink_metadata(path) {
        Ok(m) if m.is_dir() => walkdir::WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum(),
        Ok(m) => m.len(),
        Err(_) => 0,
    }
}
