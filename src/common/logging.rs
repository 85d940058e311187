use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::errors::PurgeError;

const RULE: &str = "==========================================";

/// Append-only run log.
///
/// Every line is written as `[YYYY-MM-DD HH:MM:SS] message`, optionally echoed
/// to stdout, and kept in memory for the end-of-run report. Write failures are
/// reported through tracing and never abort the run.
pub struct RunLog {
    path: Option<PathBuf>,
    file: Option<File>,
    echo: bool,
    messages: Vec<String>,
}

impl RunLog {
    /// Open (or create) a log file for appending
    pub fn open(path: &Path, echo: bool) -> Result<Self, PurgeError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| PurgeError::Log {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| PurgeError::Log {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            file: Some(file),
            echo,
            messages: Vec::new(),
        })
    }

    /// A log that only keeps lines in memory
    pub fn memory() -> Self {
        Self {
            path: None,
            file: None,
            echo: false,
            messages: Vec::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Messages written so far, without timestamps
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn line(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let formatted = format_line(Local::now(), message);
        if self.echo {
            println!("{}", formatted);
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", formatted) {
                tracing::warn!(error = %e, "failed to append to run log");
            }
        }
        self.messages.push(message.to_string());
    }

    /// Section banner: rule, title, rule
    pub fn banner(&mut self, title: impl AsRef<str>) {
        self.line(RULE);
        self.line(title);
        self.line(RULE);
    }

    pub fn found(&mut self, description: impl AsRef<str>) {
        self.line(format!("FOUND: {}", description.as_ref()));
    }

    pub fn removing(&mut self, description: impl AsRef<str>) {
        self.line(format!("Removing: {}", description.as_ref()));
    }

    pub fn warning(&mut self, message: impl AsRef<str>) {
        self.line(format!("WARNING: {}", message.as_ref()));
    }

    /// Append multi-line command output, one indented line each
    pub fn output(&mut self, text: &str) {
        for l in text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
            self.line(format!("  | {}", l));
        }
    }
}

/// Format one log line
pub fn format_line(ts: DateTime<Local>, message: &str) -> String {
    format!("[{}] {}", ts.format("%Y-%m-%d %H:%M:%S"), message)
}

/// Strip the `[timestamp] ` prefix from a log line, if present
pub fn message_of(line: &str) -> &str {
    let trimmed = line.trim_end();
    if trimmed.starts_with('[') {
        if let Some(end) = trimmed.find("] ") {
            return &trimmed[end + 2..];
        }
    }
    trimmed
}

/// Initialise tracing. With a log dir, diagnostics also go to
/// `clawpurge.trace.log` there; the returned guard must be kept alive.
pub fn init_tracing(
    verbose: bool,
    log_dir: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = if verbose { "clawpurge=debug" } else { "clawpurge=warn" };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let dir = log_dir.filter(|d| verbose && std::fs::create_dir_all(d).is_ok());
    match dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "clawpurge.trace.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("clawpurge=debug"));
            let _ = tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .try_init();
            Some(guard)
        }
        _ => {
            let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn line_format_and_message_extraction() {
        let ts = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let line = format_line(ts, "FOUND: config directory: /Users/a/.openclaw");
        assert_eq!(
            line,
            "[2026-03-04 05:06:07] FOUND: config directory: /Users/a/.openclaw"
        );
        assert_eq!(
            message_of(&line),
            "FOUND: config directory: /Users/a/.openclaw"
        );
        assert_eq!(message_of("Removing: x\n"), "Removing: x");
    }

    #[test]
    fn banner_is_three_lines() {
        let mut log = RunLog::memory();
        log.banner("Applications");
        assert_eq!(log.messages().len(), 3);
        assert_eq!(log.messages()[1], "Applications");
        assert_eq!(log.messages()[0], log.messages()[2]);
    }

    #[test]
    fn file_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/detection.log");
        {
            let mut log = RunLog::open(&path, false).unwrap();
            log.found("one");
        }
        {
            let mut log = RunLog::open(&path, false).unwrap();
            log.removing("two");
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let messages: Vec<&str> = text.lines().map(message_of).collect();
        assert_eq!(messages, vec!["FOUND: one", "Removing: two"]);
    }

    #[test]
    fn output_skips_blank_lines() {
        let mut log = RunLog::memory();
        log.output("up to date, audited 1 package in 300ms\n\n");
        assert_eq!(
            log.messages(),
            &["  | up to date, audited 1 package in 300ms".to_string()]
        );
    }
}
