//! Running-process checks and termination via pgrep / pkill / osascript.

use std::time::Duration;

use crate::common::command::CommandOutcome;
use crate::common::host::Host;

/// How a process query matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Exact process name (`-x`)
    Exact,
    /// Case-insensitive substring of the full command line (`-i -f`)
    Pattern,
}

impl MatchMode {
    fn flags(&self) -> &'static [&'static str] {
        match self {
            MatchMode::Exact => &["-x"],
            MatchMode::Pattern => &["-i", "-f"],
        }
    }
}

/// PIDs matching `name`, excluding this process
pub fn find_pids(host: &Host, name: &str, mode: MatchMode) -> Vec<u32> {
    let mut args: Vec<&str> = mode.flags().to_vec();
    args.push(name);
    let outcome = host.runner.run("pgrep", &args);
    if !outcome.ok {
        return Vec::new();
    }
    parse_pids(&outcome.stdout)
}

pub fn parse_pids(text: &str) -> Vec<u32> {
    let own = std::process::id();
    text.lines()
        .filter_map(|l| l.trim().parse::<u32>().ok())
        .filter(|pid| *pid != own)
        .collect()
}

/// Send a signal to every process matching `name`
pub fn kill(host: &Host, name: &str, mode: MatchMode, force: bool) -> CommandOutcome {
    let mut args: Vec<&str> = Vec::new();
    if force {
        args.push("-9");
    }
    args.extend_from_slice(mode.flags());
    args.push(name);
    host.runner.run("pkill", &args)
}

/// Ask a GUI application to quit through AppleScript
pub fn request_quit(host: &Host, app_name: &str) -> CommandOutcome {
    let script = format!("quit app \"{}\"", app_name.replace('"', ""));
    host.runner.run("osascript", &["-e", &script])
}

/// Outcome of stopping a GUI app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitResult {
    NotRunning,
    Quit,
    ForceKilled,
    StillRunning,
}

/// Graceful quit, wait `grace`, then force-kill if the app is still there
pub fn quit_app(host: &Host, app_name: &str, grace: Duration) -> QuitResult {
    if find_pids(host, app_name, MatchMode::Exact).is_empty() {
        return QuitResult::NotRunning;
    }

    let asked = request_quit(host, app_name);
    if !asked.ok {
        tracing::debug!(app = app_name, output = %asked.combined(), "quit request failed");
    }
    if !grace.is_zero() {
        std::thread::sleep(grace);
    }
    if find_pids(host, app_name, MatchMode::Exact).is_empty() {
        return QuitResult::Quit;
    }

    kill(host, app_name, MatchMode::Exact, true);
    if find_pids(host, app_name, MatchMode::Exact).is_empty() {
        QuitResult::ForceKilled
    } else {
        QuitResult::StillRunning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::command::fake::FakeRunner;

    #[test]
    fn pids_exclude_self_and_garbage() {
        let own = std::process::id();
        let text = format!("123\n{}\nnot-a-pid\n456\n", own);
        assert_eq!(parse_pids(&text), vec![123, 456]);
    }

    #[test]
    fn pattern_mode_is_case_insensitive_full_command() {
        let runner =
            FakeRunner::new().on("pgrep -i -f openclaw", CommandOutcome::success("77\n"));
        let host = Host::new(&runner, vec![]);
        assert_eq!(find_pids(&host, "openclaw", MatchMode::Pattern), vec![77]);
        assert!(find_pids(&host, "openclaw", MatchMode::Exact).is_empty());
    }

    #[test]
    fn quit_not_running_sends_nothing() {
        let runner = FakeRunner::new();
        let host = Host::new(&runner, vec![]);
        assert_eq!(
            quit_app(&host, "OpenClaw", Duration::ZERO),
            QuitResult::NotRunning
        );
        assert!(!runner.called("osascript"));
    }

    #[test]
    fn quit_escalates_to_force_kill() {
        // pgrep keeps answering, so the app never goes away
        let runner = FakeRunner::new().on("pgrep -x OpenClaw", CommandOutcome::success("900\n"));
        let host = Host::new(&runner, vec![]);
        assert_eq!(
            quit_app(&host, "OpenClaw", Duration::ZERO),
            QuitResult::StillRunning
        );
        assert!(runner.called("osascript -e quit app \"OpenClaw\""));
        assert!(runner.called("pkill -9 -x OpenClaw"));
    }
}
