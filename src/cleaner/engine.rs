use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::report::{RemovalReport, RemovalStatus};
use crate::apps;
use crate::catalogue::Catalogue;
use crate::common::host::Host;
use crate::common::logging::RunLog;
use crate::common::safety::{entry_exists, path_size, remove_path};
use crate::pkgmgr::{self, BrewKind};
use crate::processes::{self, MatchMode, QuitResult};
use crate::scanner::probes;
use crate::scanner::{FindingKind, Inventory};
use crate::services::{self, ServiceDescriptor, ServiceKind, UnloadResult};
use crate::users::LocalUser;

/// Removal run options
#[derive(Debug, Clone)]
pub struct RemovalOptions {
    /// Log what would happen without touching anything
    pub dry_run: bool,
    /// Wait between a graceful app quit and the force-kill
    pub quit_grace: Duration,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            quit_grace: Duration::from_secs(5),
        }
    }
}

/// Remove every trace of the product.
///
/// Phases run in a fixed order because later ones assume earlier ones are
/// done: native uninstall, processes, services, deletion, verification. No
/// step aborts the run; problems become warnings on the report.
pub fn run_removal(
    host: &Host,
    catalogue: &Catalogue,
    opts: &RemovalOptions,
    log: &mut RunLog,
) -> RemovalReport {
    let start = Instant::now();
    let mut exec = Executor {
        host,
        catalogue,
        opts,
        log,
        handled: HashSet::new(),
        report: RemovalReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            dry_run: opts.dry_run,
            ..Default::default()
        },
    };

    exec.start_banner();
    exec.native_uninstall();
    exec.stop_processes();
    let descriptors = exec.unload_services();
    exec.delete_traces(&descriptors);
    exec.verify();
    exec.summary();

    let mut report = exec.report;
    report.duration_secs = start.elapsed().as_secs_f64();
    report
}

struct Executor<'r, 'h> {
    host: &'r Host<'h>,
    catalogue: &'r Catalogue,
    opts: &'r RemovalOptions,
    log: &'r mut RunLog,
    /// Case-folded paths already dealt with in this run
    handled: HashSet<String>,
    report: RemovalReport,
}

impl<'r, 'h> Executor<'r, 'h> {
    fn start_banner(&mut self) {
        let mode = if self.opts.dry_run { " [dry run]" } else { "" };
        self.log.banner(format!(
            "{} removal started (run {}){}",
            self.catalogue.product.name, self.report.run_id, mode
        ));
        let users: Vec<&str> = self.host.users.iter().map(|u| u.username.as_str()).collect();
        if users.is_empty() {
            self.log.line("Local users: none found (system scope only)");
        } else {
            self.log.line(format!("Local users: {}", users.join(", ")));
        }
    }

    fn warn(&mut self, message: String) {
        self.log.warning(&message);
        self.report.warnings.push(message);
    }

    // ─── Phase 1: native uninstall ────────────────────────────────────────

    fn native_uninstall(&mut self) {
        self.log.banner("Phase 1: native uninstall");
        if self.host.users.is_empty() {
            self.log.line("No local users; skipping native uninstall");
            return;
        }

        let (host, catalogue) = (self.host, self.catalogue);
        let args: Vec<&str> = catalogue.cli.uninstall_args.iter().map(String::as_str).collect();
        for user in &host.users {
            let Some(cli) = self.find_cli(user) else {
                self.log
                    .line(format!("No {} CLI found for user {}", catalogue.product.name, user.username));
                continue;
            };
            let program = cli.to_string_lossy().to_string();

            if self.opts.dry_run {
                self.log.line(format!(
                    "Would run: {} {} (user {})",
                    program,
                    args.join(" "),
                    user.username
                ));
                continue;
            }

            self.log
                .line(format!("Uninstalling via {} (user {})", program, user.username));
            let outcome = host.runner.run_as_user(user, &program, &args);
            self.log.output(&outcome.combined());
            if outcome.ok {
                self.report.native_uninstalls += 1;
            } else {
                self.warn(format!(
                    "native uninstall via {} failed for user {} ({}); continuing with manual removal",
                    program,
                    user.username,
                    outcome.status_text()
                ));
            }
        }
    }

    /// First executable product CLI in the user's search dirs, then the system ones
    fn find_cli(&self, user: &LocalUser) -> Option<PathBuf> {
        let dirs = probes::cli_search_dirs(self.host, self.catalogue, Some(user))
            .into_iter()
            .chain(probes::cli_search_dirs(self.host, self.catalogue, None));
        for dir in dirs {
            for bin in &self.catalogue.cli.binaries {
                let path = dir.join(bin);
                if pkgmgr::is_executable(&path) {
                    return Some(path);
                }
            }
        }
        None
    }

    // ─── Phase 2: processes ───────────────────────────────────────────────

    fn stop_processes(&mut self) {
        self.log.banner("Phase 2: running processes");
        let grace = self.opts.quit_grace;
        let catalogue = self.catalogue;

        for app in &catalogue.apps {
            if self.opts.dry_run {
                if !processes::find_pids(self.host, &app.name, MatchMode::Exact).is_empty() {
                    self.log.line(format!("Would quit application: {}", app.name));
                }
                continue;
            }
            match processes::quit_app(self.host, &app.name, grace) {
                QuitResult::NotRunning => {}
                QuitResult::Quit => {
                    self.log.line(format!("Quit application: {}", app.name));
                    self.report.processes_stopped += 1;
                }
                QuitResult::ForceKilled => {
                    self.log
                        .line(format!("Force-killed application after quit timeout: {}", app.name));
                    self.report.processes_stopped += 1;
                }
                QuitResult::StillRunning => {
                    self.warn(format!("application {} is still running after force-kill", app.name));
                }
            }
        }

        let exact = self.catalogue.processes.exact.iter().map(|n| (n.clone(), MatchMode::Exact));
        let patterns = self
            .catalogue
            .processes
            .patterns
            .iter()
            .map(|p| (p.clone(), MatchMode::Pattern));
        let targets: Vec<(String, MatchMode)> = exact.chain(patterns).collect();

        for (name, mode) in targets {
            let pids = processes::find_pids(self.host, &name, mode);
            if pids.is_empty() {
                continue;
            }
            let pid_list = pids.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
            if self.opts.dry_run {
                self.log.line(format!("Would stop process: {} (pid {})", name, pid_list));
                continue;
            }
            self.log.line(format!("Stopping process: {} (pid {})", name, pid_list));
            processes::kill(self.host, &name, mode, false);
            if !processes::find_pids(self.host, &name, mode).is_empty() {
                processes::kill(self.host, &name, mode, true);
            }
            self.report.processes_stopped += 1;
        }
    }

    // ─── Phase 3: services ────────────────────────────────────────────────

    fn unload_services(&mut self) -> Vec<ServiceDescriptor> {
        self.log.banner("Phase 3: launch services");
        let descriptors = services::discover_descriptors(self.host, self.catalogue);

        for d in &descriptors {
            let target = d.target();
            if !services::is_loaded(self.host, &d.label, d.user.as_ref()) {
                self.log.line(format!("Not loaded: {}", target));
                continue;
            }
            if self.opts.dry_run {
                self.log.line(format!("Would unload service: {}", target));
                continue;
            }
            match services::unload(self.host, d) {
                UnloadResult::Bootout => {
                    self.log.line(format!("Unloaded service: {} (bootout)", target));
                    self.report.services_unloaded += 1;
                }
                UnloadResult::LegacyUnload => {
                    self.log
                        .line(format!("Unloaded service: {} (legacy unload)", target));
                    self.report.services_unloaded += 1;
                }
                UnloadResult::Failed { bootout, unload } => {
                    self.warn(format!(
                        "could not unload {}: bootout {}, unload {}",
                        target,
                        bootout.status_text(),
                        unload.status_text()
                    ));
                }
            }
        }

        // Labels still loaded without a descriptor on disk
        let with_descriptor: HashSet<&str> = descriptors.iter().map(|d| d.label.as_str()).collect();
        let orphans: Vec<String> = probes::loaded_candidates(self.catalogue, &descriptors)
            .into_iter()
            .filter(|l| !with_descriptor.contains(l.as_str()))
            .collect();
        let host = self.host;
        let scopes: Vec<Option<&LocalUser>> = host
            .users
            .iter()
            .map(Some)
            .chain(std::iter::once(None))
            .collect();
        for label in &orphans {
            for user in &scopes {
                if !services::is_loaded(self.host, label, *user) {
                    continue;
                }
                let domain = user.map(|u| u.gui_domain()).unwrap_or_else(|| "system".into());
                let target = format!("{}/{}", domain, label);
                if self.opts.dry_run {
                    self.log.line(format!("Would unload service: {}", target));
                    continue;
                }
                let outcome = services::launchd::bootout_label(self.host, label, *user);
                if outcome.ok {
                    self.log.line(format!("Unloaded service: {} (bootout)", target));
                    self.report.services_unloaded += 1;
                } else {
                    self.warn(format!("could not unload {}: {}", target, outcome.status_text()));
                }
            }
        }

        descriptors
    }

    // ─── Phase 4: deletion ────────────────────────────────────────────────

    fn delete_traces(&mut self, descriptors: &[ServiceDescriptor]) {
        self.log.banner("Phase 4: removal");

        for bundle in apps::discover_bundles(self.host, self.catalogue) {
            self.delete(&FindingKind::Application.to_string(), &bundle.path);
        }

        for d in descriptors {
            let kind = match d.kind {
                ServiceKind::UserLaunchAgent => FindingKind::LaunchAgent,
                ServiceKind::SystemLaunchAgent => FindingKind::SystemLaunchAgent,
                ServiceKind::SystemLaunchDaemon => FindingKind::LaunchDaemon,
            };
            self.delete(&kind.to_string(), &d.path);
        }

        let mut inv = Inventory::new();
        probes::probe_cli_binaries(self.host, self.catalogue, &mut inv);
        self.delete_inventory(inv);

        self.remove_npm_packages();
        self.remove_brew_packages();

        let mut inv = Inventory::new();
        probes::probe_config_and_data(self.host, self.catalogue, &mut inv);
        self.delete_inventory(inv);

        self.forget_receipts();
    }

    fn delete_inventory(&mut self, inv: Inventory) {
        for finding in inv.into_findings() {
            if let Some(path) = &finding.path {
                self.delete(&finding.kind.to_string(), path);
            }
        }
    }

    /// Delete one path. Absent paths are a silent no-op.
    fn delete(&mut self, kind: &str, path: &Path) {
        let key = path.to_string_lossy().to_lowercase();
        if !entry_exists(path) || !self.handled.insert(key) {
            return;
        }
        let description = format!("{}: {}", kind, path.display());

        if self.opts.dry_run {
            self.log.line(format!("Would remove: {}", description));
            self.report.removed.push(description);
            return;
        }

        let host = self.host;
        let size = path_size(path);
        match remove_path(path, &host.homes(), &host.keep) {
            Ok(true) => {
                self.log.removing(&description);
                self.report.removed.push(description);
                self.report.bytes_freed += size;
            }
            Ok(false) => self.log.line(format!("Already gone: {}", path.display())),
            Err(e) => self.warn(format!("could not remove {}: {}", path.display(), e)),
        }
    }

    fn remove_npm_packages(&mut self) {
        let catalogue = self.catalogue;
        let npms = pkgmgr::locate_npms(self.host);
        if npms.is_empty() {
            self.log.line("npm not found; skipping npm packages");
        }

        for npm in &npms {
            let root = pkgmgr::npm_global_root(self.host, npm);
            for package in &catalogue.packages.npm {
                let dir = root.as_ref().map(|r| r.join(package));
                let present = dir.as_deref().map(entry_exists).unwrap_or(false);
                if !present && !pkgmgr::npm_lists_global(self.host, npm, package) {
                    continue;
                }
                let owner = npm.owner_label();

                if self.opts.dry_run {
                    self.log.line(format!(
                        "Would run: {} uninstall -g {} ({})",
                        npm.path.display(),
                        package,
                        owner
                    ));
                    continue;
                }

                if present {
                    self.log
                        .line(format!("Uninstalling npm global package: {} ({})", package, owner));
                } else {
                    self.log.line(format!(
                        "Uninstalling npm global package: {} ({}, not present under npm root)",
                        package, owner
                    ));
                }
                let outcome = npm.run(self.host, &["uninstall", "-g", package]);
                self.log.output(&outcome.combined());

                if !outcome.ok {
                    self.warn(format!(
                        "npm uninstall -g {} failed ({}, {})",
                        package,
                        owner,
                        outcome.status_text()
                    ));
                }
                match dir {
                    Some(dir) if present && !entry_exists(&dir) => {
                        let description = format!("npm global package: {} ({})", package, owner);
                        self.log.removing(&description);
                        self.handled.insert(dir.to_string_lossy().to_lowercase());
                        self.report.removed.push(description);
                    }
                    Some(dir) if present => {
                        self.delete(&FindingKind::PackageArtifact.to_string(), &dir);
                    }
                    _ => {}
                }
            }
        }

        let mut inv = Inventory::new();
        probes::probe_npm_artifacts(self.host, self.catalogue, &npms, &mut inv);
        self.delete_inventory(inv);
    }

    fn remove_brew_packages(&mut self) {
        let Some(brew) = pkgmgr::locate_brew(self.host) else {
            self.log.line("Homebrew not found; skipping formulae and casks");
            return;
        };

        let catalogue = self.catalogue;
        let formulae = catalogue.packages.brew_formulae.iter().map(|n| (n, BrewKind::Formula));
        let casks = catalogue.packages.brew_casks.iter().map(|n| (n, BrewKind::Cask));
        for (name, kind) in formulae.chain(casks) {
            if !pkgmgr::brew_lists(self.host, &brew, kind, name) {
                continue;
            }
            if self.opts.dry_run {
                self.log.line(format!("Would remove: {}: {}", kind, name));
                self.report.removed.push(format!("{}: {}", kind, name));
                continue;
            }
            self.log.line(format!("Uninstalling {}: {}", kind, name));
            let outcome = brew.run(self.host, &["uninstall", kind.flag(), name]);
            self.log.output(&outcome.combined());
            if outcome.ok {
                let description = format!("{}: {}", kind, name);
                self.log.removing(&description);
                self.report.removed.push(description);
            } else {
                self.warn(format!(
                    "brew uninstall {} {} failed ({})",
                    kind.flag(),
                    name,
                    outcome.status_text()
                ));
            }
        }
    }

    fn forget_receipts(&mut self) {
        for id in probes::matching_receipts(self.host, self.catalogue) {
            let description = format!("installer receipt: {}", id);
            if self.opts.dry_run {
                self.log.line(format!("Would remove: {}", description));
                self.report.removed.push(description);
                continue;
            }
            let outcome = self.host.runner.run("pkgutil", &["--forget", &id]);
            if outcome.ok {
                self.log.removing(&description);
                self.report.removed.push(description);
            } else {
                self.warn(format!(
                    "pkgutil --forget {} failed ({})",
                    id,
                    outcome.status_text()
                ));
            }
        }
    }

    // ─── Phase 5: verification ────────────────────────────────────────────

    fn verify(&mut self) {
        self.log.banner("Phase 5: verification");
        if self.opts.dry_run {
            self.log.line("Dry run: verification skipped");
            return;
        }

        let mut residues = Vec::new();
        let exact = self.catalogue.processes.exact.iter().map(|n| (n, MatchMode::Exact));
        let patterns = self.catalogue.processes.patterns.iter().map(|p| (p, MatchMode::Pattern));
        for (name, mode) in exact.chain(patterns) {
            let pids = processes::find_pids(self.host, name, mode);
            if !pids.is_empty() {
                residues.push(format!("process still running: {} ({} pid(s))", name, pids.len()));
            }
        }
        for user in &self.host.users {
            for dir in &self.catalogue.config_dirs {
                let path = user.home_path(dir);
                if entry_exists(&path) {
                    residues.push(format!("config directory still present: {}", path.display()));
                }
            }
        }

        if residues.is_empty() {
            self.log.line("No residues found");
        }
        for residue in residues {
            self.log.warning(format!("residue: {}", residue));
            self.report.residues.push(residue);
        }
    }

    fn summary(&mut self) {
        self.log.banner("Summary");
        let r = &self.report;
        let verb = if r.dry_run { "would be removed" } else { "removed" };
        self.log.line(format!(
            "Removal summary: {} {}, {} warning(s), {} residue(s)",
            r.removed.len(),
            verb,
            r.warnings.len(),
            r.residues.len()
        ));
        if r.dry_run || !r.changed_anything() {
            self.log.line(&self.catalogue.fingerprints.no_changes);
        }
        let status = r.status();
        self.log.line(format!("STATUS: {}", status));
        if status == RemovalStatus::PartialWithWarnings {
            tracing::warn!(
                warnings = r.warnings.len(),
                residues = r.residues.len(),
                "removal finished with warnings"
            );
        }
    }
}
