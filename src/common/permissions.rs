use std::path::Path;

use super::command::CommandRunner;
use super::errors::PurgeError;

/// Known SIP-protected paths that cannot be modified
const SIP_PATHS: &[&str] = &[
    "/System",
    "/usr/bin",
    "/usr/lib",
    "/usr/libexec",
    "/usr/sbin",
    "/bin",
    "/sbin",
    "/Applications/Utilities",
];

/// Check if a path is SIP-protected
pub fn is_sip_protected(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    SIP_PATHS
        .iter()
        .any(|p| path_str == *p || path_str.starts_with(&format!("{}/", p)))
}

/// Whether the effective user is root
pub fn is_root(runner: &dyn CommandRunner) -> bool {
    let outcome = runner.run("id", &["-u"]);
    outcome.ok && outcome.stdout.trim() == "0"
}

/// Fail fast unless running as root
pub fn require_root(runner: &dyn CommandRunner, command: &str) -> Result<(), PurgeError> {
    if is_root(runner) {
        Ok(())
    } else {
        Err(PurgeError::NotRoot {
            command: command.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::command::fake::FakeRunner;
    use crate::common::command::CommandOutcome;

    #[test]
    fn sip_paths() {
        assert!(is_sip_protected(Path::new("/System/Library")));
        assert!(is_sip_protected(Path::new("/usr/bin/ls")));
        assert!(!is_sip_protected(Path::new("/usr/local/bin/openclaw")));
        assert!(!is_sip_protected(Path::new("/usr/binx")));
    }

    #[test]
    fn root_check_reads_id() {
        let root = FakeRunner::new().on("id -u", CommandOutcome::success("0\n"));
        assert!(require_root(&root, "detect").is_ok());

        let user = FakeRunner::new().on("id -u", CommandOutcome::success("501\n"));
        assert!(matches!(
            require_root(&user, "remove"),
            Err(PurgeError::NotRoot { .. })
        ));
    }
}
