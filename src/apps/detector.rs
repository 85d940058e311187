use std::path::{Path, PathBuf};

use crate::catalogue::{AppEntry, Catalogue};
use crate::common::host::Host;
use crate::common::safety::entry_exists;
use crate::services::glob_ci;
use crate::users::LocalUser;

/// An application bundle found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct AppBundle {
    pub name: String,
    pub bundle_id: Option<String>,
    pub version: Option<String>,
    pub path: PathBuf,
    /// Set for bundles under a user's ~/Applications
    pub user: Option<LocalUser>,
}

/// A Library file or directory belonging to the product
#[derive(Debug, Clone, PartialEq)]
pub struct AssociatedFile {
    pub path: PathBuf,
    pub kind: AssociatedKind,
    pub user: Option<LocalUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociatedKind {
    AppSupport,
    Cache,
    Preferences,
    SavedState,
    Container,
    GroupContainer,
    Cookies,
    HttpStorage,
    WebKit,
    Logs,
}

impl std::fmt::Display for AssociatedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssociatedKind::AppSupport => write!(f, "application support"),
            AssociatedKind::Cache => write!(f, "cache"),
            AssociatedKind::Preferences => write!(f, "preferences"),
            AssociatedKind::SavedState => write!(f, "saved state"),
            AssociatedKind::Container => write!(f, "container"),
            AssociatedKind::GroupContainer => write!(f, "group container"),
            AssociatedKind::Cookies => write!(f, "cookies"),
            AssociatedKind::HttpStorage => write!(f, "HTTP storage"),
            AssociatedKind::WebKit => write!(f, "WebKit data"),
            AssociatedKind::Logs => write!(f, "logs"),
        }
    }
}

/// Application directories: /Applications, then each user's ~/Applications
fn app_dirs(host: &Host) -> Vec<(PathBuf, Option<LocalUser>)> {
    let mut dirs = vec![(host.system_path("/Applications"), None)];
    for user in &host.users {
        dirs.push((user.home_path("Applications"), Some(user.clone())));
    }
    dirs
}

/// Find the product's app bundles: known names first, then any `*<pattern>*.app`
pub fn discover_bundles(host: &Host, catalogue: &Catalogue) -> Vec<AppBundle> {
    let mut bundles: Vec<AppBundle> = Vec::new();

    for (dir, user) in app_dirs(host) {
        if !dir.is_dir() {
            continue;
        }

        for app in &catalogue.apps {
            let path = dir.join(format!("{}.app", app.name));
            if entry_exists(&path) {
                push_unique(&mut bundles, parse_app_bundle(&path, user.clone()));
            }
        }

        for pattern in &catalogue.name_patterns {
            for path in glob_ci(&dir, &format!("*{}*.app", pattern)) {
                push_unique(&mut bundles, parse_app_bundle(&path, user.clone()));
            }
        }
    }

    bundles
}

fn push_unique(bundles: &mut Vec<AppBundle>, bundle: AppBundle) {
    if !bundles.iter().any(|b| b.path == bundle.path) {
        bundles.push(bundle);
    }
}

/// Parse an .app bundle to extract metadata
fn parse_app_bundle(app_path: &Path, user: Option<LocalUser>) -> AppBundle {
    let name = app_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let info_plist = app_path.join("Contents/Info.plist");
    let (bundle_id, version) = if info_plist.exists() {
        parse_info_plist(&info_plist)
    } else {
        (None, None)
    };

    AppBundle {
        name,
        bundle_id,
        version,
        path: app_path.to_path_buf(),
        user,
    }
}

/// Parse Info.plist to extract bundle ID and version
fn parse_info_plist(path: &Path) -> (Option<String>, Option<String>) {
    let plist_val = match plist::Value::from_file(path) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let dict = match plist_val.as_dictionary() {
        Some(d) => d,
        None => return (None, None),
    };

    let bundle_id = dict
        .get("CFBundleIdentifier")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string());

    let version = dict
        .get("CFBundleShortVersionString")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string());

    (bundle_id, version)
}

/// Library files for every catalogue app, per user and at system level.
///
/// Both the bundle id and the app name are tried as identifiers, since older
/// releases keyed their support folders by name.
pub fn find_associated_files(host: &Host, catalogue: &Catalogue) -> Vec<AssociatedFile> {
    let mut files = Vec::new();

    for app in &catalogue.apps {
        for user in &host.users {
            let library = user.home_path("Library");
            user_library_files(&library, app, Some(user), &mut files);
        }
        system_library_files(host, app, &mut files);
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);
    files
}

fn user_library_files(
    library: &Path,
    app: &AppEntry,
    user: Option<&LocalUser>,
    files: &mut Vec<AssociatedFile>,
) {
    for id in [app.bundle_id.as_str(), app.name.as_str()] {
        check(library.join("Application Support").join(id), AssociatedKind::AppSupport, user, files);
        check(library.join("Caches").join(id), AssociatedKind::Cache, user, files);
        check(
            library.join("Preferences").join(format!("{}.plist", id)),
            AssociatedKind::Preferences,
            user,
            files,
        );
        check_glob(
            &library.join("Preferences/ByHost"),
            &format!("{}.*", id),
            AssociatedKind::Preferences,
            user,
            files,
        );
        check(
            library
                .join("Saved Application State")
                .join(format!("{}.savedState", id)),
            AssociatedKind::SavedState,
            user,
            files,
        );
        check(library.join("Containers").join(id), AssociatedKind::Container, user, files);
        check_glob(
            &library.join("Group Containers"),
            &format!("*{}*", id),
            AssociatedKind::GroupContainer,
            user,
            files,
        );
        check(
            library.join("Cookies").join(format!("{}.binarycookies", id)),
            AssociatedKind::Cookies,
            user,
            files,
        );
        check(library.join("HTTPStorages").join(id), AssociatedKind::HttpStorage, user, files);
        check(library.join("WebKit").join(id), AssociatedKind::WebKit, user, files);
        check(library.join("Logs").join(id), AssociatedKind::Logs, user, files);
    }
}

fn system_library_files(host: &Host, app: &AppEntry, files: &mut Vec<AssociatedFile>) {
    let library = host.system_path("/Library");
    for id in [app.bundle_id.as_str(), app.name.as_str()] {
        check(library.join("Application Support").join(id), AssociatedKind::AppSupport, None, files);
        check(library.join("Caches").join(id), AssociatedKind::Cache, None, files);
        check(
            library.join("Preferences").join(format!("{}.plist", id)),
            AssociatedKind::Preferences,
            None,
            files,
        );
        check(library.join("Logs").join(id), AssociatedKind::Logs, None, files);
    }
}

fn check(
    path: PathBuf,
    kind: AssociatedKind,
    user: Option<&LocalUser>,
    files: &mut Vec<AssociatedFile>,
) {
    if entry_exists(&path) {
        files.push(AssociatedFile {
            path,
            kind,
            user: user.cloned(),
        });
    }
}

fn check_glob(
    dir: &Path,
    pattern: &str,
    kind: AssociatedKind,
    user: Option<&LocalUser>,
    files: &mut Vec<AssociatedFile>,
) {
    if !dir.is_dir() {
        return;
    }
    for entry in glob_ci(dir, pattern) {
        check(entry, kind, user, files);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::command::fake::FakeRunner;

    fn make_app(path: &Path, bundle_id: &str) {
        std::fs::create_dir_all(path.join("Contents")).unwrap();
        let mut dict = plist::Dictionary::new();
        dict.insert("CFBundleIdentifier".into(), plist::Value::String(bundle_id.into()));
        dict.insert("CFBundleShortVersionString".into(), plist::Value::String("2026.2".into()));
        plist::Value::Dictionary(dict)
            .to_file_xml(path.join("Contents/Info.plist"))
            .unwrap();
    }

    #[test]
    fn finds_known_and_pattern_bundles_once() {
        let root = tempfile::tempdir().unwrap();
        make_app(&root.path().join("Applications/OpenClaw.app"), "ai.openclaw.mac");
        make_app(&root.path().join("Applications/Moltbot Beta.app"), "bot.molt.beta");
        make_app(&root.path().join("Applications/Safari.app"), "com.apple.Safari");

        let runner = FakeRunner::new();
        let host = Host::new(&runner, vec![]).with_system_root(root.path());
        let bundles = discover_bundles(&host, &Catalogue::builtin());

        let names: Vec<&str> = bundles.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["OpenClaw", "Moltbot Beta"]);
        assert_eq!(bundles[0].bundle_id.as_deref(), Some("ai.openclaw.mac"));
        assert_eq!(bundles[0].version.as_deref(), Some("2026.2"));
    }

    #[test]
    fn associated_files_per_user_and_system() {
        let root = tempfile::tempdir().unwrap();
        let home = root.path().join("Users/alice");
        let alice = LocalUser::new("alice", 501, &home);
        let lib = home.join("Library");
        std::fs::create_dir_all(lib.join("Caches/ai.openclaw.mac")).unwrap();
        std::fs::create_dir_all(lib.join("Application Support/Clawdbot")).unwrap();
        std::fs::create_dir_all(lib.join("Preferences/ByHost")).unwrap();
        std::fs::write(lib.join("Preferences/ByHost/bot.molt.mac.ABCD.plist"), "").unwrap();
        std::fs::create_dir_all(root.path().join("Library/Logs/OpenClaw")).unwrap();

        let runner = FakeRunner::new();
        let host = Host::new(&runner, vec![alice]).with_system_root(root.path());
        let files = find_associated_files(&host, &Catalogue::builtin());

        assert_eq!(files.len(), 4);
        let system: Vec<_> = files.iter().filter(|f| f.user.is_none()).collect();
        assert_eq!(system.len(), 1);
        assert_eq!(system[0].kind, AssociatedKind::Logs);
    }
}
