use std::path::{Path, PathBuf};

use crate::common::command::CommandRunner;

/// A local (human) account on the Mac
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LocalUser {
    pub username: String,
    pub uid: u32,
    pub home: PathBuf,
}

impl LocalUser {
    pub fn new(username: impl Into<String>, uid: u32, home: impl Into<PathBuf>) -> Self {
        Self {
            username: username.into(),
            uid,
            home: home.into(),
        }
    }

    /// Resolve a home-relative path (`~/x`, `x`) for this user
    pub fn home_path(&self, rel: &str) -> PathBuf {
        let rel = rel.strip_prefix("~/").unwrap_or(rel);
        self.home.join(rel)
    }

    /// launchd GUI domain for this user
    pub fn gui_domain(&self) -> String {
        format!("gui/{}", self.uid)
    }
}

/// Enumerate local accounts with `uid >= min_uid` whose home directory exists.
///
/// Directory services are queried once; the list is threaded through the
/// rest of the run.
pub fn discover_local_users(runner: &dyn CommandRunner, min_uid: u32) -> Vec<LocalUser> {
    let listing = runner.run("dscl", &[".", "-list", "/Users", "UniqueID"]);
    if !listing.ok {
        tracing::warn!(status = ?listing.status, "dscl user listing failed");
        return Vec::new();
    }

    let mut users = Vec::new();
    for (name, uid) in parse_uid_listing(&listing.stdout, min_uid) {
        let record = runner.run(
            "dscl",
            &[".", "-read", &format!("/Users/{}", name), "NFSHomeDirectory"],
        );
        let home = parse_home_record(&record.stdout)
            .unwrap_or_else(|| PathBuf::from("/Users").join(&name));
        if home_exists(&home) {
            users.push(LocalUser::new(name, uid, home));
        } else {
            tracing::debug!(user = %name, home = %home.display(), "skipping user without home");
        }
    }

    users.sort_by_key(|u| u.uid);
    users
}

fn home_exists(home: &Path) -> bool {
    home.is_dir()
}

/// Parse `dscl . -list /Users UniqueID` output into `(name, uid)` pairs
pub fn parse_uid_listing(text: &str, min_uid: u32) -> Vec<(String, u32)> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let uid: u32 = parts.next()?.parse().ok()?;
            // Service accounts start with '_' and sit below 500 anyway
            if uid >= min_uid && !name.starts_with('_') {
                Some((name.to_string(), uid))
            } else {
                None
            }
        })
        .collect()
}

/// Parse `dscl . -read /Users/<name> NFSHomeDirectory` output
pub fn parse_home_record(text: &str) -> Option<PathBuf> {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        if let Some(rest) = line.strip_prefix("NFSHomeDirectory:") {
            let value = rest.trim();
            // Long values are wrapped onto the next line
            let value = if value.is_empty() {
                lines.next().map(str::trim).unwrap_or("")
            } else {
                value
            };
            if !value.is_empty() {
                return Some(PathBuf::from(value));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::command::fake::FakeRunner;
    use crate::common::command::CommandOutcome;

    #[test]
    fn uid_listing_applies_threshold() {
        let listing = "_spotlight 89\nroot 0\nnobody -2\nalice 501\nbob 502\nguest 201\n";
        let users = parse_uid_listing(listing, 501);
        assert_eq!(
            users,
            vec![("alice".to_string(), 501), ("bob".to_string(), 502)]
        );
    }

    #[test]
    fn home_record_inline_and_wrapped() {
        assert_eq!(
            parse_home_record("NFSHomeDirectory: /Users/alice\n"),
            Some(PathBuf::from("/Users/alice"))
        );
        assert_eq!(
            parse_home_record("NFSHomeDirectory:\n /Users/Long Name\n"),
            Some(PathBuf::from("/Users/Long Name"))
        );
        assert_eq!(parse_home_record("No such key: NFSHomeDirectory"), None);
    }

    #[test]
    fn users_without_home_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let alice_home = dir.path().join("alice");
        std::fs::create_dir(&alice_home).unwrap();

        let runner = FakeRunner::new()
            .on(
                "dscl . -list /Users UniqueID",
                CommandOutcome::success("alice 501\nghost 503\n"),
            )
            .on(
                "dscl . -read /Users/alice",
                CommandOutcome::success(format!("NFSHomeDirectory: {}\n", alice_home.display())),
            )
            .on(
                "dscl . -read /Users/ghost",
                CommandOutcome::success("NFSHomeDirectory: /nonexistent/ghost\n"),
            );

        let users = discover_local_users(&runner, 501);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].gui_domain(), "gui/501");
        assert_eq!(users[0].home_path("~/.openclaw"), alice_home.join(".openclaw"));
    }
}
