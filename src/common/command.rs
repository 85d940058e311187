use std::process::Command;

use crate::users::LocalUser;

/// Result of running one external command.
///
/// Callers look at `ok` to decide between "log and continue" paths; a
/// failed command is never turned into an error on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutcome {
    pub ok: bool,
    /// Exit status, `None` if the process could not be spawned or was signalled
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            ok: true,
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Outcome for a program that could not be started at all
    pub fn spawn_failed(err: &std::io::Error) -> Self {
        Self {
            ok: false,
            status: None,
            stdout: String::new(),
            stderr: err.to_string(),
        }
    }

    /// stdout followed by stderr, trimmed
    pub fn combined(&self) -> String {
        let mut out = self.stdout.trim().to_string();
        let err = self.stderr.trim();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out
    }

    /// Short status text for log lines
    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit {}", code),
            None => "not started".to_string(),
        }
    }
}

/// Seam for every external command the tool runs.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutcome;

    /// Run a command as a local user with that user's login environment
    fn run_as_user(&self, user: &LocalUser, program: &str, args: &[&str]) -> CommandOutcome {
        let mut full = vec!["-u", user.username.as_str(), "-H", program];
        full.extend_from_slice(args);
        self.run("sudo", &full)
    }
}

/// Runs commands on the real host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutcome {
        tracing::debug!(program, ?args, "running command");
        match Command::new(program).args(args).output() {
            Ok(out) => {
                let outcome = CommandOutcome {
                    ok: out.status.success(),
                    status: out.status.code(),
                    stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                };
                tracing::debug!(program, status = ?outcome.status, "command finished");
                outcome
            }
            Err(e) => {
                tracing::debug!(program, error = %e, "command failed to start");
                CommandOutcome::spawn_failed(&e)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_joins_streams() {
        let outcome = CommandOutcome {
            ok: false,
            status: Some(1),
            stdout: "up to date\n".into(),
            stderr: "  warn\n".into(),
        };
        assert_eq!(outcome.combined(), "up to date\nwarn");
        assert_eq!(outcome.status_text(), "exit 1");
    }

    #[test]
    fn missing_program_is_not_started() {
        let outcome = SystemRunner.run("/nonexistent/clawpurge-test-binary", &[]);
        assert!(!outcome.ok);
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.status_text(), "not started");
    }

    #[test]
    fn run_as_user_goes_through_sudo() {
        let runner = fake::FakeRunner::new();
        let user = LocalUser::new("alice", 501, "/Users/alice");
        runner.run_as_user(&user, "npm", &["root", "-g"]);
        assert!(runner.called("sudo -u alice -H npm root -g"));
    }
}
