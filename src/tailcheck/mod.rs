//! Tail check: does the latest detection run end in a positive result?

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::common::logging::message_of;
use crate::scanner::RESULT_DETECTED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TailResult {
    Detected,
    NotDetected,
    LogNotFound,
}

impl TailResult {
    pub fn label(&self) -> &'static str {
        match self {
            TailResult::Detected => "Detected",
            TailResult::NotDetected => "Not Detected",
            TailResult::LogNotFound => "Log Not Found",
        }
    }
}

/// Tagged form printed for the management agent
impl std::fmt::Display for TailResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<result>{}</result>", self.label())
    }
}

/// Look for the positive result line among the last `lines` lines of the log
pub fn check(path: &Path, lines: usize) -> Result<TailResult> {
    let text = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TailResult::LogNotFound),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read log: {}", path.display()))
        }
    };
    Ok(check_text(&text, lines))
}

pub fn check_text(text: &str, lines: usize) -> TailResult {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    if all[start..]
        .iter()
        .any(|l| message_of(l).contains(RESULT_DETECTED))
    {
        TailResult::Detected
    } else {
        TailResult::NotDetected
    }
}
