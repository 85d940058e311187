//! False-positive classifier over a detection log and a removal log.
//!
//! The only package-manager hits that can be false are the ones produced by a
//! manager's own list query: npm in particular answers success for names it
//! does not have installed. Everything else the detector reports is a direct
//! filesystem, process or service observation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::catalogue::Fingerprints;
use crate::common::logging::message_of;

/// `FOUND:` prefixes produced by package-manager list queries
pub const PACKAGE_MANAGER_PREFIXES: &[&str] = &[
    "FOUND: npm global package:",
    "FOUND: Homebrew formula:",
    "FOUND: Homebrew cask:",
];

/// Counts extracted from a detection log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectionStats {
    pub total: usize,
    pub package_manager: usize,
}

impl DetectionStats {
    /// Matches not attributable to a package-manager query
    pub fn other(&self) -> usize {
        self.total.saturating_sub(self.package_manager)
    }
}

/// Counts and fingerprints extracted from a removal log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalStats {
    /// `Removing:` lines
    pub removals: usize,
    /// `Uninstalling` lines
    pub uninstall_attempts: usize,
    /// A package manager said there was nothing to uninstall
    pub manager_noop: bool,
    /// The run reported that it changed nothing
    pub no_changes: bool,
}

pub fn scan_detection_log(text: &str) -> DetectionStats {
    let mut stats = DetectionStats::default();
    for message in text.lines().map(message_of) {
        if !message.starts_with("FOUND:") {
            continue;
        }
        stats.total += 1;
        if PACKAGE_MANAGER_PREFIXES.iter().any(|p| message.starts_with(p)) {
            stats.package_manager += 1;
        }
    }
    stats
}

pub fn scan_removal_log(text: &str, fingerprints: &Fingerprints) -> RemovalStats {
    let mut stats = RemovalStats::default();
    for message in text.lines().map(message_of) {
        if message.starts_with("Removing:") {
            stats.removals += 1;
        } else if message.starts_with("Uninstalling") {
            stats.uninstall_attempts += 1;
        }
        if fingerprints
            .manager_noop
            .iter()
            .any(|f| message.contains(f.as_str()))
        {
            stats.manager_noop = true;
        }
        if message.trim() == fingerprints.no_changes {
            stats.no_changes = true;
        }
    }
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Genuine,
    FalsePositive,
    NoDetection,
    Unusual,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Genuine => write!(f, "genuine"),
            Verdict::FalsePositive => write!(f, "false_positive"),
            Verdict::NoDetection => write!(f, "no_detection"),
            Verdict::Unusual => write!(f, "unusual"),
        }
    }
}

impl Verdict {
    /// Exit signal for the orchestrator: 0 means treat as a real detection
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Genuine | Verdict::Unusual => 0,
            Verdict::FalsePositive | Verdict::NoDetection => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub verdict: Verdict,
    /// Number of the decision rule that matched
    pub rule: u8,
    pub confidence: Confidence,
    pub rationale: Vec<String>,
    pub detection: DetectionStats,
    pub removal: RemovalStats,
}

impl Classification {
    pub fn exit_code(&self) -> i32 {
        self.verdict.exit_code()
    }
}

/// Ordered decision list; the first matching rule wins
pub fn classify(detection: DetectionStats, removal: RemovalStats) -> Classification {
    let mut rationale = vec![format!(
        "Detection: {} match(es), {} from package-manager queries, {} other",
        detection.total,
        detection.package_manager,
        detection.other()
    )];
    rationale.push(format!(
        "Removal: {} deletion(s), {} uninstall attempt(s)",
        removal.removals, removal.uninstall_attempts
    ));

    let (verdict, rule, confidence) = if removal.removals > 0 {
        rationale.push("Something was actually deleted".to_string());
        if detection.other() > 0 {
            rationale.push(format!(
                "Note: {} other detection match(es) were not weighed separately",
                detection.other()
            ));
        }
        if detection.total == 0 {
            rationale.push(
                "Note: detection found nothing yet removal deleted something; review the detection log"
                    .to_string(),
            );
        }
        (Verdict::Genuine, 1, Confidence::High)
    } else if detection.other() > 0 {
        rationale.push(
            "Evidence beyond package-manager queries was found but nothing was removed; flag for manual review"
                .to_string(),
        );
        (Verdict::Genuine, 2, Confidence::Medium)
    } else if detection.package_manager > 0 && removal.manager_noop {
        rationale.push(
            "Only package-manager matches, and the manager reported nothing to uninstall".to_string(),
        );
        (Verdict::FalsePositive, 3, Confidence::High)
    } else if detection.package_manager > 0 {
        rationale.push(
            "Only package-manager matches and nothing was removed, without a not-installed fingerprint"
                .to_string(),
        );
        (Verdict::FalsePositive, 4, Confidence::Low)
    } else if detection.total == 0 {
        rationale.push("Nothing was detected and nothing was removed".to_string());
        (Verdict::NoDetection, 5, Confidence::High)
    } else {
        rationale.push("Contradictory counts; treated as genuine".to_string());
        (Verdict::Unusual, 6, Confidence::Low)
    };

    if removal.no_changes && verdict != Verdict::NoDetection {
        rationale.push("The removal run reported no changes".to_string());
    }

    Classification {
        verdict,
        rule,
        confidence,
        rationale,
        detection,
        removal,
    }
}

/// Read a log for classification. A missing file reads as empty; the returned
/// flag tells the caller it was missing.
pub fn read_log(path: &Path) -> Result<(String, bool)> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok((text, true)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((String::new(), false)),
        Err(e) => Err(e).with_context(|| format!("Failed to read log: {}", path.display())),
    }
}

/// Classify a pair of log files
pub fn classify_files(
    detection_log: &Path,
    removal_log: &Path,
    fingerprints: &Fingerprints,
) -> Result<Classification> {
    let (detection_text, detection_found) = read_log(detection_log)?;
    let (removal_text, removal_found) = read_log(removal_log)?;
    tracing::debug!(
        detection = %detection_log.display(),
        removal = %removal_log.display(),
        "classifying logs"
    );

    let mut result = classify(
        scan_detection_log(&detection_text),
        scan_removal_log(&removal_text, fingerprints),
    );
    if !detection_found {
        result.rationale.push(format!(
            "Detection log not found ({}); treated as empty",
            detection_log.display()
        ));
    }
    if !removal_found {
        result.rationale.push(format!(
            "Removal log not found ({}); treated as empty",
            removal_log.display()
        ));
    }
    Ok(result)
}
