pub mod inventory;
pub mod probes;

use serde::Serialize;
use std::time::Instant;

use crate::catalogue::Catalogue;
use crate::common::host::Host;
use crate::common::logging::RunLog;

pub use inventory::{Finding, FindingKind, Inventory};

/// Final log line of a run that found something
pub const RESULT_DETECTED: &str = "RESULT: Detected";
/// Final log line of a clean run
pub const RESULT_NOT_DETECTED: &str = "RESULT: Not Detected";

/// Detection sections, in walk order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Processes,
    Services,
    Applications,
    CliBinaries,
    PackageManagers,
    ConfigAndData,
    Receipts,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Processes,
        Section::Services,
        Section::Applications,
        Section::CliBinaries,
        Section::PackageManagers,
        Section::ConfigAndData,
        Section::Receipts,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::Processes => "Running processes",
            Section::Services => "Launch services",
            Section::Applications => "Applications",
            Section::CliBinaries => "Command-line tools",
            Section::PackageManagers => "Package managers",
            Section::ConfigAndData => "Configuration and data",
            Section::Receipts => "Installer receipts",
        }
    }

    fn probe(&self, host: &Host, catalogue: &Catalogue, inv: &mut Inventory) {
        match self {
            Section::Processes => probes::probe_processes(host, catalogue, inv),
            Section::Services => probes::probe_services(host, catalogue, inv),
            Section::Applications => probes::probe_applications(host, catalogue, inv),
            Section::CliBinaries => probes::probe_cli_binaries(host, catalogue, inv),
            Section::PackageManagers => probes::probe_package_managers(host, catalogue, inv),
            Section::ConfigAndData => probes::probe_config_and_data(host, catalogue, inv),
            Section::Receipts => probes::probe_receipts(host, catalogue, inv),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionCount {
    pub section: Section,
    pub found: usize,
}

/// Outcome of a detection run
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub run_id: String,
    pub product: String,
    pub users: Vec<String>,
    pub total: usize,
    pub sections: Vec<SectionCount>,
    pub findings: Vec<Finding>,
    pub duration_secs: f64,
}

impl DetectionReport {
    pub fn detected(&self) -> bool {
        self.total > 0
    }
}

/// Walk the whole catalogue for every local user and the system scope.
///
/// Every unique hit is logged as one `FOUND:` line. Nothing on the machine is
/// modified.
pub fn run_detection(host: &Host, catalogue: &Catalogue, log: &mut RunLog) -> DetectionReport {
    let start = Instant::now();
    let run_id = uuid::Uuid::new_v4().to_string();
    let users: Vec<String> = host.users.iter().map(|u| u.username.clone()).collect();

    log.banner(format!("{} detection started (run {})", catalogue.product.name, run_id));
    log.line(format!("Known names: {}", catalogue.all_names().join(", ")));
    if users.is_empty() {
        log.line("Local users: none found (system scope only)");
    } else {
        log.line(format!("Local users: {}", users.join(", ")));
    }

    let mut inv = Inventory::new();
    let mut sections = Vec::new();

    for section in Section::ALL {
        log.banner(section.title());
        let before = inv.len();
        section.probe(host, catalogue, &mut inv);

        for finding in &inv.findings()[before..] {
            log.found(finding.description());
        }
        let found = inv.len() - before;
        if found == 0 {
            log.line("Nothing found");
        }
        tracing::debug!(section = section.title(), found, "section complete");
        sections.push(SectionCount { section, found });
    }

    let total = inv.len();
    log.banner("Summary");
    log.line(format!("Detection summary: {} item(s) found", total));
    log.line(if total > 0 {
        RESULT_DETECTED
    } else {
        RESULT_NOT_DETECTED
    });

    DetectionReport {
        run_id,
        product: catalogue.product.name.clone(),
        users,
        total,
        sections,
        findings: inv.into_findings(),
        duration_secs: start.elapsed().as_secs_f64(),
    }
}
