use std::path::PathBuf;

/// Typed errors for ClawPurge operations.
/// We use `anyhow` at the top level for CLI error handling,
/// but these typed errors allow modules to be precise about failures.
#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    /// File system operation failed
    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Detection and removal need an administrative session
    #[error("{command} must be run as root (try: sudo clawpurge {command})")]
    NotRoot { command: String },

    /// Path is on the never-delete list
    #[error("Refusing to remove protected path: '{}'", path.display())]
    ProtectedPath { path: PathBuf },

    /// SIP-protected path cannot be modified
    #[error("SIP-protected path (cannot modify): '{}'", path.display())]
    SipProtected { path: PathBuf },

    /// Configuration file is invalid
    #[error("Config error in '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Catalogue file is invalid or incomplete
    #[error("Catalogue error in '{}': {message}", path.display())]
    Catalogue { path: PathBuf, message: String },

    /// Run log could not be opened
    #[error("Cannot open log '{}': {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PurgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PurgeError::Io {
            path: path.into(),
            source,
        }
    }
}
