//! Package-manager discovery and the queries the walks run through them.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::common::command::CommandOutcome;
use crate::common::host::Host;
use crate::users::LocalUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerKind {
    Npm,
    Homebrew,
}

impl std::fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerKind::Npm => write!(f, "npm"),
            ManagerKind::Homebrew => write!(f, "Homebrew"),
        }
    }
}

impl ManagerKind {
    pub fn binary(&self) -> &'static str {
        match self {
            ManagerKind::Npm => "npm",
            ManagerKind::Homebrew => "brew",
        }
    }

    /// Fixed candidate install locations, most specific first.
    /// `~/` entries are resolved per user and may contain globs.
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            ManagerKind::Npm => &[
                "/opt/homebrew/bin/npm",
                "/usr/local/bin/npm",
                "~/.volta/bin/npm",
                "~/.npm-global/bin/npm",
                "~/.local/bin/npm",
                "~/.nvm/versions/node/*/bin/npm",
            ],
            ManagerKind::Homebrew => &[
                "/opt/homebrew/bin/brew",
                "/usr/local/bin/brew",
                "/usr/local/Homebrew/bin/brew",
            ],
        }
    }
}

/// A located package-manager executable, bound to the user it runs as
#[derive(Debug, Clone, PartialEq)]
pub struct Manager {
    pub kind: ManagerKind,
    pub path: PathBuf,
    /// `None` means run as the current (root) user
    pub user: Option<LocalUser>,
}

impl Manager {
    pub fn run(&self, host: &Host, args: &[&str]) -> CommandOutcome {
        let program = self.path.to_string_lossy();
        match &self.user {
            Some(user) => host.runner.run_as_user(user, &program, args),
            None => host.runner.run(&program, args),
        }
    }

    pub fn owner_label(&self) -> String {
        match &self.user {
            Some(u) => format!("user {}", u.username),
            None => "system".to_string(),
        }
    }
}

pub fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Locate a package manager for `user` (or the system scope when `None`).
///
/// Checks the fixed candidate list first, then falls back to a PATH lookup in
/// the user's login shell. For a user scope the home-relative candidates are
/// tried before the shared ones. Returns `None` when the manager is absent.
pub fn locate(host: &Host, kind: ManagerKind, user: Option<&LocalUser>) -> Option<Manager> {
    let (home, shared): (Vec<&str>, Vec<&str>) =
        kind.candidates().iter().copied().partition(|c| c.starts_with("~/"));
    let ordered = if user.is_some() {
        home.into_iter().chain(shared)
    } else {
        shared.into_iter().chain(home)
    };
    for candidate in ordered {
        let Some(resolved) = host.resolve(candidate, user) else {
            continue;
        };
        let pattern = resolved.to_string_lossy();
        let found = if pattern.contains('*') {
            let mut matches: Vec<PathBuf> = glob::glob(&pattern)
                .map(|paths| paths.filter_map(|p| p.ok()).collect())
                .unwrap_or_default();
            // Newest node version sorts last
            matches.sort();
            matches.into_iter().rev().find(|p| is_executable(p))
        } else if is_executable(&resolved) {
            Some(resolved)
        } else {
            None
        };
        if let Some(path) = found {
            return Some(Manager {
                kind,
                path,
                user: user.cloned(),
            });
        }
    }

    let lookup = format!("command -v {}", kind.binary());
    let outcome = match user {
        Some(u) => host.runner.run_as_user(u, "sh", &["-lc", &lookup]),
        None => host.runner.run("sh", &["-c", &lookup]),
    };
    if !outcome.ok {
        return None;
    }
    let path = PathBuf::from(outcome.stdout.lines().next()?.trim());
    if path.is_absolute() {
        Some(Manager {
            kind,
            path,
            user: user.cloned(),
        })
    } else {
        None
    }
}

/// Every distinct npm install reachable on the host: the system one plus
/// one per user. Two scopes resolving to the same executable are merged.
pub fn locate_npms(host: &Host) -> Vec<Manager> {
    let mut found: Vec<Manager> = Vec::new();
    if let Some(m) = locate(host, ManagerKind::Npm, None) {
        found.push(m);
    }
    for user in &host.users {
        if let Some(m) = locate(host, ManagerKind::Npm, Some(user)) {
            if !found.iter().any(|f| f.path == m.path) {
                found.push(m);
            }
        }
    }
    found
}

/// Homebrew refuses to run as root, so it is always bound to the first local
/// user that can reach it.
pub fn locate_brew(host: &Host) -> Option<Manager> {
    host.users
        .iter()
        .find_map(|u| locate(host, ManagerKind::Homebrew, Some(u)))
}

/// `npm list -g <pkg> --depth=0` succeeded and did not print `(empty)`.
///
/// npm reports success for some uninstalled names, so a hit here is only a
/// proxy; the classifier knows this.
pub fn npm_lists_global(host: &Host, npm: &Manager, package: &str) -> bool {
    let outcome = npm.run(host, &["list", "-g", package, "--depth=0"]);
    outcome.ok && !outcome.stdout.contains("(empty)")
}

/// Global `node_modules` directory for this npm
pub fn npm_global_root(host: &Host, npm: &Manager) -> Option<PathBuf> {
    let outcome = npm.run(host, &["root", "-g"]);
    if !outcome.ok {
        return None;
    }
    let root = PathBuf::from(outcome.stdout.trim());
    (root.is_absolute() && root.is_dir()).then_some(root)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrewKind {
    Formula,
    Cask,
}

impl BrewKind {
    pub fn flag(&self) -> &'static str {
        match self {
            BrewKind::Formula => "--formula",
            BrewKind::Cask => "--cask",
        }
    }
}

impl std::fmt::Display for BrewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrewKind::Formula => write!(f, "Homebrew formula"),
            BrewKind::Cask => write!(f, "Homebrew cask"),
        }
    }
}

pub fn brew_lists(host: &Host, brew: &Manager, kind: BrewKind, name: &str) -> bool {
    brew.run(host, &["list", kind.flag(), name]).ok
}
