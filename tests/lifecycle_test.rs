//! Detection, removal and classification against a scratch filesystem.

use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use clawpurge::catalogue::Catalogue;
use clawpurge::classifier::{self, Verdict};
use clawpurge::cleaner::{run_removal, RemovalOptions, RemovalStatus};
use clawpurge::common::logging::RunLog;
use clawpurge::common::{CommandOutcome, CommandRunner, Host};
use clawpurge::scanner::{run_detection, RESULT_DETECTED, RESULT_NOT_DETECTED};
use clawpurge::tailcheck::{self, TailResult};
use clawpurge::users::LocalUser;

/// Answers `pkgutil --pkgs` until the receipt is forgotten; everything else fails
#[derive(Default)]
struct ScriptedRunner {
    receipts: RefCell<Vec<String>>,
    calls: RefCell<Vec<String>>,
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> CommandOutcome {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.borrow_mut().push(line);
        match (program, args) {
            ("pkgutil", ["--pkgs"]) => {
                CommandOutcome::success(self.receipts.borrow().join("\n"))
            }
            ("pkgutil", ["--forget", id]) => {
                self.receipts.borrow_mut().retain(|r| r != *id);
                CommandOutcome::success(format!("Forgot package '{}' on '/'.\n", id))
            }
            _ => CommandOutcome::failure(1, ""),
        }
    }
}

fn populate(root: &Path, home: &Path) {
    for dir in [
        home.join(".openclaw/agents"),
        home.join(".clawdbot-work"),
        home.join("Library/Application Support/ai.openclaw.mac"),
        home.join("Library/Caches/Moltbot"),
        root.join("Applications/OpenClaw.app/Contents"),
    ] {
        std::fs::create_dir_all(dir).unwrap();
    }
    std::fs::write(home.join(".openclaw/openclaw.json"), "{\"gateway\":{}}").unwrap();
    std::fs::create_dir_all(home.join("Library/LaunchAgents")).unwrap();
    std::fs::write(
        home.join("Library/LaunchAgents/ai.openclaw.gateway.plist"),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <plist version=\"1.0\"><dict><key>Label</key><string>ai.openclaw.gateway</string></dict></plist>\n",
    )
    .unwrap();
}

fn messages(log: &RunLog) -> Vec<String> {
    log.messages().to_vec()
}

#[test]
fn detect_remove_classify_round() {
    let root = tempfile::tempdir().unwrap();
    let home = root.path().join("Users/alice");
    populate(root.path(), &home);

    let runner = ScriptedRunner::default();
    runner.receipts.borrow_mut().push("ai.openclaw.pkg".to_string());
    let alice = LocalUser::new("alice", 501, &home);
    let host = Host::new(&runner, vec![alice]).with_system_root(root.path());
    let catalogue = Catalogue::builtin();

    // Detection
    let detection_path = root.path().join("logs/detection.log");
    let mut log = RunLog::open(&detection_path, false).unwrap();
    let report = run_detection(&host, &catalogue, &mut log);
    drop(log);
    assert!(report.detected());
    let text = std::fs::read_to_string(&detection_path).unwrap();
    let found: Vec<&str> = text.lines().filter(|l| l.contains("] FOUND: ")).collect();
    assert_eq!(found.len(), report.total);
    assert!(text.contains("FOUND: installer receipt: ai.openclaw.pkg"));
    assert!(text.contains("FOUND: configuration directory: "));
    assert!(text.contains("FOUND: profile directory: "));
    assert!(text.contains("FOUND: launch agent: "));
    assert_eq!(tailcheck::check(&detection_path, 10).unwrap(), TailResult::Detected);

    // Removal
    let removal_path = root.path().join("logs/removal.log");
    let mut log = RunLog::open(&removal_path, false).unwrap();
    let opts = RemovalOptions {
        dry_run: false,
        quit_grace: Duration::ZERO,
    };
    let removal = run_removal(&host, &catalogue, &opts, &mut log);
    drop(log);
    assert_eq!(removal.status(), RemovalStatus::Complete);
    assert!(!home.join(".openclaw").exists());
    assert!(!home.join(".clawdbot-work").exists());
    assert!(!home.join("Library/LaunchAgents/ai.openclaw.gateway.plist").exists());
    assert!(!root.path().join("Applications/OpenClaw.app").exists());
    assert!(home.join("Library/LaunchAgents").exists());
    assert!(runner
        .calls
        .borrow()
        .iter()
        .any(|c| c == "pkgutil --forget ai.openclaw.pkg"));

    // Classification
    let c = classifier::classify_files(&detection_path, &removal_path, &catalogue.fingerprints)
        .unwrap();
    assert_eq!(c.verdict, Verdict::Genuine);
    assert_eq!(c.rule, 1);
    assert_eq!(c.exit_code(), 0);

    // A second pass finds nothing and removes nothing
    let mut log = RunLog::memory();
    let report = run_detection(&host, &catalogue, &mut log);
    assert_eq!(report.total, 0);
    assert_eq!(messages(&log).last().unwrap(), RESULT_NOT_DETECTED);

    let mut log = RunLog::memory();
    let removal = run_removal(&host, &catalogue, &opts, &mut log);
    assert!(removal.removed.is_empty());
    assert!(messages(&log).contains(&"No changes made".to_string()));
}

#[test]
fn exact_and_pattern_hits_on_one_path_count_once() {
    let root = tempfile::tempdir().unwrap();
    let home = root.path().join("Users/bob");
    std::fs::create_dir_all(home.join(".moltbot")).unwrap();
    std::fs::create_dir_all(root.path().join("Applications/Moltbot.app")).unwrap();

    let runner = ScriptedRunner::default();
    let host = Host::new(&runner, vec![LocalUser::new("bob", 502, &home)])
        .with_system_root(root.path());
    let mut log = RunLog::memory();
    let report = run_detection(&host, &Catalogue::builtin(), &mut log);

    let app_lines = messages(&log)
        .iter()
        .filter(|m| m.starts_with("FOUND:") && m.contains("Moltbot.app"))
        .count();
    assert_eq!(app_lines, 1);
    assert_eq!(report.total, 2);
    assert_eq!(messages(&log).last().unwrap(), RESULT_DETECTED);
}

#[test]
fn nothing_installed_is_not_detected() {
    let root = tempfile::tempdir().unwrap();
    let home = root.path().join("Users/carol");
    std::fs::create_dir_all(home.join("Library/Caches/com.apple.Safari")).unwrap();

    let runner = ScriptedRunner::default();
    let host = Host::new(&runner, vec![LocalUser::new("carol", 503, &home)])
        .with_system_root(root.path());
    let mut log = RunLog::memory();
    let report = run_detection(&host, &Catalogue::builtin(), &mut log);

    assert_eq!(report.total, 0);
    assert!(!messages(&log).iter().any(|m| m.starts_with("FOUND:")));
}
