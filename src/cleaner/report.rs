use serde::Serialize;

/// Final status of a removal run. Never a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStatus {
    Complete,
    PartialWithWarnings,
}

impl std::fmt::Display for RemovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalStatus::Complete => write!(f, "complete"),
            RemovalStatus::PartialWithWarnings => write!(f, "partial (warnings)"),
        }
    }
}

/// Report from a removal run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemovalReport {
    pub run_id: String,
    pub dry_run: bool,
    /// Descriptions of everything actually removed (or that would be, on a dry run)
    pub removed: Vec<String>,
    pub bytes_freed: u64,
    pub native_uninstalls: usize,
    pub processes_stopped: usize,
    pub services_unloaded: usize,
    pub warnings: Vec<String>,
    /// Traces still present after cleanup
    pub residues: Vec<String>,
    pub duration_secs: f64,
}

impl RemovalReport {
    pub fn status(&self) -> RemovalStatus {
        if self.warnings.is_empty() && self.residues.is_empty() {
            RemovalStatus::Complete
        } else {
            RemovalStatus::PartialWithWarnings
        }
    }

    pub fn changed_anything(&self) -> bool {
        !self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residues_make_a_run_partial() {
        let mut report = RemovalReport::default();
        assert_eq!(report.status(), RemovalStatus::Complete);
        report.residues.push("config directory still present".into());
        assert_eq!(report.status(), RemovalStatus::PartialWithWarnings);
        assert_eq!(report.status().to_string(), "partial (warnings)");
    }
}
