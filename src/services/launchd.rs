use std::path::{Path, PathBuf};

use crate::catalogue::Catalogue;
use crate::common::command::CommandOutcome;
use crate::common::host::Host;
use crate::users::LocalUser;

/// A launchd descriptor belonging to the product
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub label: String,
    pub path: PathBuf,
    pub kind: ServiceKind,
    /// Owner for user agents
    pub user: Option<LocalUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    UserLaunchAgent,
    SystemLaunchAgent,
    SystemLaunchDaemon,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceKind::UserLaunchAgent => write!(f, "launch agent"),
            ServiceKind::SystemLaunchAgent => write!(f, "system launch agent"),
            ServiceKind::SystemLaunchDaemon => write!(f, "launch daemon"),
        }
    }
}

impl ServiceDescriptor {
    /// launchd service target, e.g. `gui/501/ai.openclaw.gateway`
    pub fn target(&self) -> String {
        match &self.user {
            Some(u) => format!("{}/{}", u.gui_domain(), self.label),
            None => format!("system/{}", self.label),
        }
    }
}

/// Descriptor directories: one per user, then the two system ones
pub fn descriptor_dirs(host: &Host) -> Vec<(PathBuf, ServiceKind, Option<LocalUser>)> {
    let mut dirs: Vec<_> = host
        .users
        .iter()
        .map(|u| {
            (
                u.home_path("Library/LaunchAgents"),
                ServiceKind::UserLaunchAgent,
                Some(u.clone()),
            )
        })
        .collect();
    dirs.push((
        host.system_path("/Library/LaunchAgents"),
        ServiceKind::SystemLaunchAgent,
        None,
    ));
    dirs.push((
        host.system_path("/Library/LaunchDaemons"),
        ServiceKind::SystemLaunchDaemon,
        None,
    ));
    dirs
}

/// Find descriptors by exact catalogue file name, then by name pattern.
///
/// The second pass catches unlisted labels; a path found by both passes is
/// returned once.
pub fn discover_descriptors(host: &Host, catalogue: &Catalogue) -> Vec<ServiceDescriptor> {
    let mut found: Vec<ServiceDescriptor> = Vec::new();
    let names = catalogue.descriptor_names();

    for (dir, kind, user) in descriptor_dirs(host) {
        if !dir.is_dir() {
            continue;
        }

        for name in &names {
            let path = dir.join(name);
            if crate::common::safety::entry_exists(&path) {
                push_unique(&mut found, descriptor_for(&path, kind, user.clone()));
            }
        }

        for pattern in &catalogue.name_patterns {
            for path in glob_ci(&dir, &format!("*{}*.plist", pattern)) {
                push_unique(&mut found, descriptor_for(&path, kind, user.clone()));
            }
        }
    }

    found
}

fn push_unique(found: &mut Vec<ServiceDescriptor>, item: ServiceDescriptor) {
    if !found.iter().any(|f| f.path == item.path) {
        found.push(item);
    }
}

fn descriptor_for(path: &Path, kind: ServiceKind, user: Option<LocalUser>) -> ServiceDescriptor {
    let label = read_label(path).unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    });
    ServiceDescriptor {
        label,
        path: path.to_path_buf(),
        kind,
        user,
    }
}

/// Read `Label` from a launchd plist
pub fn read_label(path: &Path) -> Option<String> {
    let plist_val = plist::Value::from_file(path).ok()?;
    let dict = plist_val.as_dictionary()?;
    dict.get("Label")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

/// Case-insensitive glob inside `dir`; a non-matching or invalid pattern yields nothing
pub fn glob_ci(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let full = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), pattern);
    match glob::glob_with(&full, options) {
        Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Whether launchd currently has `label` loaded in the user's GUI domain
/// (or the system domain when `user` is `None`)
pub fn is_loaded(host: &Host, label: &str, user: Option<&LocalUser>) -> bool {
    let target = match user {
        Some(u) => format!("{}/{}", u.gui_domain(), label),
        None => format!("system/{}", label),
    };
    host.runner.run("launchctl", &["print", &target]).ok
}

/// How a service was taken down
#[derive(Debug, Clone, PartialEq)]
pub enum UnloadResult {
    Bootout,
    LegacyUnload,
    Failed { bootout: CommandOutcome, unload: CommandOutcome },
}

/// `launchctl bootout`, falling back to legacy `launchctl unload <path>`
pub fn unload(host: &Host, service: &ServiceDescriptor) -> UnloadResult {
    let bootout = host
        .runner
        .run("launchctl", &["bootout", &service.target()]);
    if bootout.ok {
        return UnloadResult::Bootout;
    }

    let path = service.path.to_string_lossy();
    let unload = match &service.user {
        Some(u) => {
            let uid = u.uid.to_string();
            host.runner
                .run("launchctl", &["asuser", &uid, "launchctl", "unload", &path])
        }
        None => host.runner.run("launchctl", &["unload", &path]),
    };
    if unload.ok {
        UnloadResult::LegacyUnload
    } else {
        UnloadResult::Failed { bootout, unload }
    }
}

/// Unload a label that has no descriptor on disk
pub fn bootout_label(host: &Host, label: &str, user: Option<&LocalUser>) -> CommandOutcome {
    let target = match user {
        Some(u) => format!("{}/{}", u.gui_domain(), label),
        None => format!("system/{}", label),
    };
    host.runner.run("launchctl", &["bootout", &target])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::command::fake::FakeRunner;

    fn write_plist(path: &Path, label: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut dict = plist::Dictionary::new();
        dict.insert("Label".into(), plist::Value::String(label.into()));
        plist::Value::Dictionary(dict).to_file_xml(path).unwrap();
    }

    #[test]
    fn exact_and_pattern_passes_do_not_duplicate() {
        let root = tempfile::tempdir().unwrap();
        let home = root.path().join("Users/alice");
        let alice = LocalUser::new("alice", 501, &home);
        write_plist(
            &home.join("Library/LaunchAgents/ai.openclaw.gateway.plist"),
            "ai.openclaw.gateway",
        );
        write_plist(
            &root.path().join("Library/LaunchDaemons/com.example.ClawdBot-helper.plist"),
            "com.example.clawdbot-helper",
        );
        write_plist(
            &root.path().join("Library/LaunchDaemons/com.apple.unrelated.plist"),
            "com.apple.unrelated",
        );

        let runner = FakeRunner::new();
        let host = Host::new(&runner, vec![alice]).with_system_root(root.path());
        let found = discover_descriptors(&host, &Catalogue::builtin());

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].target(), "gui/501/ai.openclaw.gateway");
        assert_eq!(found[0].kind, ServiceKind::UserLaunchAgent);
        assert_eq!(found[1].label, "com.example.clawdbot-helper");
        assert_eq!(found[1].target(), "system/com.example.clawdbot-helper");
    }

    #[test]
    fn glob_without_matches_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(glob_ci(dir.path(), "*openclaw*").is_empty());
        assert!(glob_ci(&dir.path().join("missing"), "*openclaw*").is_empty());
    }

    #[test]
    fn unload_falls_back_to_legacy() {
        let runner = FakeRunner::new().on("launchctl unload", CommandOutcome::success(""));
        let host = Host::new(&runner, vec![]);
        let svc = ServiceDescriptor {
            label: "ai.openclaw.gateway".into(),
            path: PathBuf::from("/Library/LaunchDaemons/ai.openclaw.gateway.plist"),
            kind: ServiceKind::SystemLaunchDaemon,
            user: None,
        };
        assert_eq!(unload(&host, &svc), UnloadResult::LegacyUnload);
        assert!(runner.called("launchctl bootout system/ai.openclaw.gateway"));
    }

    #[test]
    fn unload_failure_keeps_both_outcomes() {
        let runner = FakeRunner::new();
        let host = Host::new(&runner, vec![]);
        let svc = ServiceDescriptor {
            label: "bot.molt.gateway".into(),
            path: PathBuf::from("/Users/a/Library/LaunchAgents/bot.molt.gateway.plist"),
            kind: ServiceKind::UserLaunchAgent,
            user: Some(LocalUser::new("a", 502, "/Users/a")),
        };
        assert!(matches!(unload(&host, &svc), UnloadResult::Failed { .. }));
        assert!(runner.called("launchctl asuser 502 launchctl unload"));
    }
}
