use colored::*;
use serde::Serialize;

use crate::classifier::{Classification, Verdict};
use crate::cleaner::{RemovalReport, RemovalStatus};
use crate::common::config::Config;
use crate::common::format::{self, format_path, format_size, print_header, print_kv, truncate};
use crate::scanner::DetectionReport;
use crate::tailcheck::TailResult;
use crate::users::LocalUser;

/// Print any report as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}

// ─── Detection ───────────────────────────────────────────────────────────────

pub fn print_detection_summary(report: &DetectionReport, log: Option<&std::path::Path>) {
    print_header(&format!("{} Detection", report.product));

    for count in &report.sections {
        let found = if count.found == 0 {
            "nothing".dimmed().to_string()
        } else {
            format::format_count(count.found).yellow().to_string()
        };
        println!("  {:<28} {}", count.section.title(), found);
    }
    println!("{}", "─".repeat(60).dimmed());
    if report.detected() {
        println!(
            "  {} {}: {} found in {}",
            "●".red(),
            "Detected".red().bold(),
            format::format_count(report.total),
            format::format_duration(report.duration_secs)
        );
    } else {
        println!(
            "  {} {} ({})",
            "●".green(),
            "Not detected".green().bold(),
            format::format_duration(report.duration_secs)
        );
    }
    if let Some(path) = log {
        println!("  Log: {}", format_path(path).dimmed());
    }
    println!();
}

// ─── Removal ─────────────────────────────────────────────────────────────────

pub fn print_removal_summary(report: &RemovalReport, log: Option<&std::path::Path>) {
    let title = if report.dry_run {
        "Removal (dry run)"
    } else {
        "Removal"
    };
    print_header(title);

    let removed_label = if report.dry_run { "Would remove" } else { "Removed" };
    print_kv(removed_label, &format::format_count(report.removed.len()));
    if !report.dry_run {
        print_kv("Space freed", &format_size(report.bytes_freed));
        print_kv("Native uninstalls", &report.native_uninstalls.to_string());
        print_kv("Processes stopped", &report.processes_stopped.to_string());
        print_kv("Services unloaded", &report.services_unloaded.to_string());
    }

    if !report.warnings.is_empty() {
        println!();
        println!(
            "  {} {}",
            "⚠".yellow(),
            format!("{} warning(s):", report.warnings.len()).yellow()
        );
        for w in &report.warnings {
            println!("    {} {}", "→".dimmed(), truncate(w, 100).dimmed());
        }
    }
    if !report.residues.is_empty() {
        println!();
        println!(
            "  {} {}",
            "✗".red(),
            format!("{} residue(s):", report.residues.len()).red()
        );
        for r in &report.residues {
            println!("    {} {}", "→".dimmed(), truncate(r, 100));
        }
    }

    println!("{}", "─".repeat(60).dimmed());
    match report.status() {
        RemovalStatus::Complete => {
            println!("  {} Status: {}", "✓".green(), "complete".green().bold())
        }
        RemovalStatus::PartialWithWarnings => println!(
            "  {} Status: {}",
            "⚠".yellow(),
            "partial (warnings)".yellow().bold()
        ),
    }
    if let Some(path) = log {
        println!("  Log: {}", format_path(path).dimmed());
    }
    println!();
}

// ─── Classification ──────────────────────────────────────────────────────────

pub fn print_classification(c: &Classification) {
    print_header("Classification");
    let verdict = match c.verdict {
        Verdict::Genuine => c.verdict.to_string().red().bold(),
        Verdict::FalsePositive => c.verdict.to_string().yellow().bold(),
        Verdict::NoDetection => c.verdict.to_string().green().bold(),
        Verdict::Unusual => c.verdict.to_string().magenta().bold(),
    };
    println!("  Verdict:     {}", verdict);
    println!("  Rule:        {}", c.rule);
    println!("  Confidence:  {}", c.confidence);
    println!();
    for line in &c.rationale {
        println!("    {} {}", "→".dimmed(), line);
    }
    println!();
    println!("RESULT: {}", c.verdict);
}

pub fn print_classification_quiet(c: &Classification) {
    println!("{}", c.verdict);
}

// ─── Tail check ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TailJson<'a> {
    result: TailResult,
    label: &'a str,
}

pub fn print_tail_result(result: TailResult, json: bool) {
    if json {
        print_json(&TailJson {
            result,
            label: result.label(),
        });
    } else {
        println!("{}", result);
    }
}

// ─── Users & config ──────────────────────────────────────────────────────────

pub fn print_users(users: &[LocalUser]) {
    print_header("Local users");
    if users.is_empty() {
        println!("  {}", "No local users found (system scope only)".dimmed());
        println!();
        return;
    }
    for user in users {
        println!(
            "  {:<20} {:>6}  {}",
            user.username.bold(),
            user.uid,
            format_path(&user.home).dimmed()
        );
    }
    println!();
}

pub fn print_config(config: &Config, path: &std::path::Path) {
    print_header("Configuration");
    print_kv("File", &format_path(path));
    print_kv("Log directory", &format_path(&config.log_dir));
    print_kv("Minimum UID", &config.min_uid.to_string());
    print_kv("Quit grace", &format!("{}s", config.quit_grace_secs));
    print_kv("Tail lines", &config.tail_lines.to_string());
    print_kv(
        "Catalogue",
        &config
            .catalogue_path
            .as_deref()
            .map(format_path)
            .unwrap_or_else(|| "built-in".to_string()),
    );
    println!();
}
