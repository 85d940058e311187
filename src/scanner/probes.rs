//! Existence probes, one per catalogue category. Probes only read; every hit
//! goes through [`Inventory::record`] so a trace is counted once.

use std::collections::HashSet;
use std::path::PathBuf;

use super::inventory::{Finding, FindingKind, Inventory};
use crate::apps;
use crate::catalogue::Catalogue;
use crate::common::host::Host;
use crate::common::safety::entry_exists;
use crate::pkgmgr::{self, BrewKind, Manager};
use crate::processes::{self, MatchMode};
use crate::services::{self, glob_ci, ServiceKind};
use crate::users::LocalUser;

/// Home-relative directories swept for name patterns
const USER_SWEEP_DIRS: &[&str] = &[
    "Applications",
    "Library/Application Support",
    "Library/Caches",
    "Library/Containers",
    "Library/Group Containers",
    "Library/HTTPStorages",
    "Library/LaunchAgents",
    "Library/Logs",
    "Library/Preferences",
    "Library/Saved Application State",
    "Library/WebKit",
];

/// System directories swept for name patterns
const SYSTEM_SWEEP_DIRS: &[&str] = &[
    "/Applications",
    "/Library/Application Support",
    "/Library/Caches",
    "/Library/LaunchAgents",
    "/Library/LaunchDaemons",
    "/Library/Logs",
    "/Library/Preferences",
    "/opt/homebrew/bin",
    "/opt/homebrew/lib/node_modules",
    "/usr/local/bin",
    "/usr/local/lib/node_modules",
    "/private/tmp",
];

pub fn probe_processes(host: &Host, catalogue: &Catalogue, inv: &mut Inventory) {
    let mut seen: HashSet<u32> = HashSet::new();

    let exact = catalogue
        .processes
        .exact
        .iter()
        .map(|n| (n, MatchMode::Exact));
    let patterns = catalogue
        .processes
        .patterns
        .iter()
        .map(|p| (p, MatchMode::Pattern));

    for (name, mode) in exact.chain(patterns) {
        let fresh: Vec<u32> = processes::find_pids(host, name, mode)
            .into_iter()
            .filter(|pid| seen.insert(*pid))
            .collect();
        if fresh.is_empty() {
            continue;
        }
        let pids = fresh
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let detail = match mode {
            MatchMode::Exact => format!("pid {}", pids),
            MatchMode::Pattern => format!("pattern match, pid {}", pids),
        };
        inv.record(Finding::new(FindingKind::RunningProcess, name.as_str()).with_detail(detail));
    }
}

pub fn probe_services(host: &Host, catalogue: &Catalogue, inv: &mut Inventory) {
    let descriptors = services::discover_descriptors(host, catalogue);

    for d in &descriptors {
        let kind = match d.kind {
            ServiceKind::UserLaunchAgent => FindingKind::LaunchAgent,
            ServiceKind::SystemLaunchAgent => FindingKind::SystemLaunchAgent,
            ServiceKind::SystemLaunchDaemon => FindingKind::LaunchDaemon,
        };
        inv.record(
            Finding::at_path(kind, &d.path)
                .with_detail(format!("label {}", d.label))
                .for_user(d.user.as_ref()),
        );
    }

    for label in loaded_candidates(catalogue, &descriptors) {
        for user in &host.users {
            if services::is_loaded(host, &label, Some(user)) {
                inv.record(
                    Finding::new(FindingKind::LoadedService, format!("{}/{}", user.gui_domain(), label))
                        .for_user(Some(user)),
                );
            }
        }
        if services::is_loaded(host, &label, None) {
            inv.record(Finding::new(FindingKind::LoadedService, format!("system/{}", label)));
        }
    }
}

/// Catalogue labels plus any label read from a discovered descriptor
pub fn loaded_candidates(
    catalogue: &Catalogue,
    descriptors: &[services::ServiceDescriptor],
) -> Vec<String> {
    let mut labels: Vec<String> = catalogue.service_labels.clone();
    for d in descriptors {
        if !labels.contains(&d.label) {
            labels.push(d.label.clone());
        }
    }
    labels
}

pub fn probe_applications(host: &Host, catalogue: &Catalogue, inv: &mut Inventory) {
    for bundle in apps::discover_bundles(host, catalogue) {
        let mut finding = Finding::at_path(FindingKind::Application, &bundle.path)
            .for_user(bundle.user.as_ref());
        let detail: Vec<String> = bundle
            .bundle_id
            .iter()
            .cloned()
            .chain(bundle.version.iter().map(|v| format!("version {}", v)))
            .collect();
        if !detail.is_empty() {
            finding = finding.with_detail(detail.join(", "));
        }
        inv.record(finding);
    }
}

/// Resolved CLI search directories for one scope
pub fn cli_search_dirs(host: &Host, catalogue: &Catalogue, user: Option<&LocalUser>) -> Vec<PathBuf> {
    catalogue
        .cli
        .search_dirs
        .iter()
        .filter(|d| user.is_some() == d.starts_with("~/"))
        .filter_map(|d| host.resolve(d, user))
        .collect()
}

pub fn probe_cli_binaries(host: &Host, catalogue: &Catalogue, inv: &mut Inventory) {
    let scopes = std::iter::once(None).chain(host.users.iter().map(Some));
    for user in scopes {
        for dir in cli_search_dirs(host, catalogue, user) {
            for bin in &catalogue.cli.binaries {
                let path = dir.join(bin);
                if entry_exists(&path) {
                    inv.record(Finding::at_path(FindingKind::CliBinary, &path).for_user(user));
                }
            }
        }
    }
}

pub fn probe_package_managers(host: &Host, catalogue: &Catalogue, inv: &mut Inventory) {
    let npms = pkgmgr::locate_npms(host);
    for npm in &npms {
        for package in &catalogue.packages.npm {
            if pkgmgr::npm_lists_global(host, npm, package) {
                inv.record(
                    Finding::new(FindingKind::NpmPackage, package.as_str())
                        .with_detail(format!("via {}", npm.path.display()))
                        .for_user(npm.user.as_ref()),
                );
            }
        }
    }
    probe_npm_artifacts(host, catalogue, &npms, inv);

    if let Some(brew) = pkgmgr::locate_brew(host) {
        probe_brew(host, catalogue, &brew, inv);
    }
}

fn probe_brew(host: &Host, catalogue: &Catalogue, brew: &Manager, inv: &mut Inventory) {
    let formulae = catalogue.packages.brew_formulae.iter().map(|n| (n, BrewKind::Formula));
    let casks = catalogue.packages.brew_casks.iter().map(|n| (n, BrewKind::Cask));
    for (name, kind) in formulae.chain(casks) {
        if pkgmgr::brew_lists(host, brew, kind, name) {
            let finding_kind = match kind {
                BrewKind::Formula => FindingKind::BrewFormula,
                BrewKind::Cask => FindingKind::BrewCask,
            };
            inv.record(
                Finding::new(finding_kind, name.as_str())
                    .with_detail(format!("via {}", brew.path.display())),
            );
        }
    }
}

/// Package directories under each npm global root matching a name pattern
pub fn probe_npm_artifacts(host: &Host, catalogue: &Catalogue, npms: &[Manager], inv: &mut Inventory) {
    for npm in npms {
        let Some(root) = pkgmgr::npm_global_root(host, npm) else {
            continue;
        };
        for pattern in &catalogue.name_patterns {
            for path in glob_ci(&root, &format!("*{}*", pattern)) {
                inv.record(
                    Finding::at_path(FindingKind::PackageArtifact, &path)
                        .for_user(npm.user.as_ref()),
                );
            }
        }
    }
}

/// Config dirs, profile-suffixed dirs, app Library data, then the pattern sweep
pub fn probe_config_and_data(host: &Host, catalogue: &Catalogue, inv: &mut Inventory) {
    for user in &host.users {
        for dir in &catalogue.config_dirs {
            let path = user.home_path(dir);
            if entry_exists(&path) {
                inv.record(Finding::at_path(FindingKind::ConfigDirectory, &path).for_user(Some(user)));
            }
        }
        for prefix in &catalogue.profile_prefixes {
            for path in glob_ci(&user.home, &format!("{}*", glob::Pattern::escape(prefix))) {
                inv.record(Finding::at_path(FindingKind::ProfileDirectory, &path).for_user(Some(user)));
            }
        }
    }

    for file in apps::find_associated_files(host, catalogue) {
        if host.is_kept(&file.path) {
            continue;
        }
        inv.record(
            Finding::at_path(FindingKind::AppData, &file.path)
                .with_detail(file.kind.to_string())
                .for_user(file.user.as_ref()),
        );
    }

    for user in &host.users {
        for rel in USER_SWEEP_DIRS {
            sweep(host, &user.home_path(rel), catalogue, Some(user), inv);
        }
    }
    for abs in SYSTEM_SWEEP_DIRS {
        sweep(host, &host.system_path(abs), catalogue, None, inv);
    }
}

fn sweep(
    host: &Host,
    dir: &std::path::Path,
    catalogue: &Catalogue,
    user: Option<&LocalUser>,
    inv: &mut Inventory,
) {
    if !dir.is_dir() {
        return;
    }
    for pattern in &catalogue.name_patterns {
        for path in glob_ci(dir, &format!("*{}*", pattern)) {
            if host.is_kept(&path) {
                continue;
            }
            inv.record(Finding::at_path(FindingKind::PatternMatch, &path).for_user(user));
        }
    }
}

/// Receipt ids from `pkgutil --pkgs` that start with a catalogue prefix
pub fn matching_receipts(host: &Host, catalogue: &Catalogue) -> Vec<String> {
    let outcome = host.runner.run("pkgutil", &["--pkgs"]);
    if !outcome.ok {
        return Vec::new();
    }
    let prefixes: Vec<String> = catalogue
        .receipt_prefixes
        .iter()
        .map(|p| p.to_lowercase())
        .collect();
    outcome
        .stdout
        .lines()
        .map(str::trim)
        .filter(|id| {
            let lower = id.to_lowercase();
            prefixes.iter().any(|p| lower.starts_with(p.as_str()))
        })
        .map(str::to_string)
        .collect()
}

pub fn probe_receipts(host: &Host, catalogue: &Catalogue, inv: &mut Inventory) {
    for id in matching_receipts(host, catalogue) {
        inv.record(Finding::new(FindingKind::InstallerReceipt, id));
    }
}
