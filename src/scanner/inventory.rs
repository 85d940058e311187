use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::users::LocalUser;

/// What kind of trace a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    RunningProcess,
    LoadedService,
    LaunchAgent,
    SystemLaunchAgent,
    LaunchDaemon,
    Application,
    CliBinary,
    NpmPackage,
    BrewFormula,
    BrewCask,
    PackageArtifact,
    ConfigDirectory,
    ProfileDirectory,
    AppData,
    PatternMatch,
    InstallerReceipt,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingKind::RunningProcess => write!(f, "running process"),
            FindingKind::LoadedService => write!(f, "loaded service"),
            FindingKind::LaunchAgent => write!(f, "launch agent"),
            FindingKind::SystemLaunchAgent => write!(f, "system launch agent"),
            FindingKind::LaunchDaemon => write!(f, "launch daemon"),
            FindingKind::Application => write!(f, "application bundle"),
            FindingKind::CliBinary => write!(f, "CLI binary"),
            FindingKind::NpmPackage => write!(f, "npm global package"),
            FindingKind::BrewFormula => write!(f, "Homebrew formula"),
            FindingKind::BrewCask => write!(f, "Homebrew cask"),
            FindingKind::PackageArtifact => write!(f, "package artifact"),
            FindingKind::ConfigDirectory => write!(f, "configuration directory"),
            FindingKind::ProfileDirectory => write!(f, "profile directory"),
            FindingKind::AppData => write!(f, "application data"),
            FindingKind::PatternMatch => write!(f, "pattern match"),
            FindingKind::InstallerReceipt => write!(f, "installer receipt"),
        }
    }
}

impl FindingKind {
    /// Hits produced by a package manager's own listing query
    pub fn is_package_manager_query(&self) -> bool {
        matches!(
            self,
            FindingKind::NpmPackage | FindingKind::BrewFormula | FindingKind::BrewCask
        )
    }
}

/// One detected trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    /// Path, label, package name or receipt id
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, subject: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            path: None,
            user: None,
            detail: None,
        }
    }

    pub fn at_path(kind: FindingKind, path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            ..Self::new(kind, path.display().to_string())
        }
    }

    pub fn for_user(mut self, user: Option<&LocalUser>) -> Self {
        self.user = user.map(|u| u.username.clone());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Text after `FOUND: ` in the run log
    pub fn description(&self) -> String {
        let mut s = format!("{}: {}", self.kind, self.subject);
        if let Some(detail) = &self.detail {
            s.push_str(&format!(" [{}]", detail));
        }
        if let Some(user) = &self.user {
            s.push_str(&format!(" (user {})", user));
        }
        s
    }

    /// Dedup key: filesystem hits are keyed by path alone so that exact and
    /// pattern passes collapse. Paths are case-folded because the default
    /// macOS volume is case-insensitive. Other hits are keyed by their full
    /// identity (kind, user, subject, detail).
    pub fn key(&self) -> String {
        match &self.path {
            Some(p) => format!("path:{}", p.to_string_lossy().to_lowercase()),
            None => format!(
                "{:?}:{}:{}:{}",
                self.kind,
                self.user.as_deref().unwrap_or("-"),
                self.subject,
                self.detail.as_deref().unwrap_or("")
            ),
        }
    }
}

/// Ordered, deduplicated set of findings
#[derive(Debug, Default)]
pub struct Inventory {
    findings: Vec<Finding>,
    seen: HashSet<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finding; returns false if the same trace was already recorded
    pub fn record(&mut self, finding: Finding) -> bool {
        if self.seen.insert(finding.key()) {
            self.findings.push(finding);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}
