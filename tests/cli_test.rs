use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn clawpurge(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("clawpurge").unwrap();
    cmd.env("CLAWPURGE_CONFIG", config_dir.join("config.toml"))
        .env("CLAWPURGE_LOG_DIR", config_dir.join("logs"))
        .arg("--no-color");
    cmd
}

fn running_as_root() -> bool {
    std::process::Command::new("id")
        .arg("-u")
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).trim() == "0")
        .unwrap_or(false)
}

// ─── Help & version ──────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("OpenClaw"))
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("tail-check"));
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("clawpurge"));
}

// ─── Privilege ───────────────────────────────────────────────────────────────

#[test]
fn test_detect_requires_root() {
    if running_as_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .arg("detect")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be run as root"));
    assert!(!dir.path().join("logs/detection.log").exists());
}

#[test]
fn test_verbose_detect_without_root_leaves_no_trace_file() {
    if running_as_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["--verbose", "detect"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be run as root"));
    assert!(!dir.path().join("logs").exists());
}

#[test]
fn test_remove_requires_root() {
    if running_as_root() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["remove", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be run as root"));
    assert!(!dir.path().join("logs/removal.log").exists());
}

// ─── Classify ────────────────────────────────────────────────────────────────

fn write_logs(dir: &Path, detection: &str, removal: &str) {
    let logs = dir.join("logs");
    std::fs::create_dir_all(&logs).unwrap();
    std::fs::write(logs.join("detection.log"), detection).unwrap();
    std::fs::write(logs.join("removal.log"), removal).unwrap();
}

#[test]
fn test_classify_genuine_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(
        dir.path(),
        "[2026-02-01 10:00:00] FOUND: application bundle: /Applications/OpenClaw.app\n\
         [2026-02-01 10:00:01] FOUND: npm global package: openclaw\n\
         [2026-02-01 10:00:01] FOUND: Homebrew cask: openclaw\n",
        "[2026-02-01 10:05:00] Removing: application bundle: /Applications/OpenClaw.app\n",
    );
    clawpurge(dir.path())
        .arg("classify")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("RESULT: genuine"));
}

#[test]
fn test_classify_npm_false_positive_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(
        dir.path(),
        "[2026-02-01 10:00:00] FOUND: npm global package: openclaw\n\
         [2026-02-01 10:00:00] FOUND: npm global package: clawdbot\n",
        "[2026-02-01 10:05:00] Uninstalling npm global package: openclaw (system)\n\
         [2026-02-01 10:05:01]   | up to date, audited 1 package in 180ms\n\
         [2026-02-01 10:05:02] No changes made\n",
    );
    clawpurge(dir.path())
        .arg("classify")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("RESULT: false_positive"));
}

#[test]
fn test_classify_missing_logs_is_no_detection() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["classify", "--format", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"verdict\": \"no_detection\""))
        .stdout(predicate::str::contains("Detection log not found"));
}

#[test]
fn test_classify_explicit_paths_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let detection = dir.path().join("d.log");
    let removal = dir.path().join("r.log");
    std::fs::write(&detection, "FOUND: running process: openclaw-gateway [pid 1]\n").unwrap();
    std::fs::write(&removal, "").unwrap();
    clawpurge(dir.path())
        .args(["classify", "--quiet", "--format", "quiet", "--detection-log"])
        .arg(&detection)
        .arg("--removal-log")
        .arg(&removal)
        .assert()
        .code(0)
        .stdout(predicate::str::diff("genuine\n"));
}

// ─── Tail check ──────────────────────────────────────────────────────────────

#[test]
fn test_tail_check_detected() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(
        dir.path(),
        "[2026-02-01 10:00:00] Detection summary: 1 item(s) found\n\
         [2026-02-01 10:00:00] RESULT: Detected\n",
        "",
    );
    clawpurge(dir.path())
        .arg("tail-check")
        .assert()
        .success()
        .stdout(predicate::str::diff("<result>Detected</result>\n"));
}

#[test]
fn test_tail_check_not_detected() {
    let dir = tempfile::tempdir().unwrap();
    write_logs(
        dir.path(),
        "[2026-02-01 10:00:00] RESULT: Not Detected\n",
        "",
    );
    clawpurge(dir.path())
        .arg("tail-check")
        .assert()
        .success()
        .stdout(predicate::str::diff("<result>Not Detected</result>\n"));
}

#[test]
fn test_tail_check_missing_log() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["tail-check", "--log"])
        .arg(dir.path().join("nope.log"))
        .assert()
        .success()
        .stdout(predicate::str::diff("<result>Log Not Found</result>\n"));
}

// ─── Catalogue & config ──────────────────────────────────────────────────────

#[test]
fn test_catalogue_show_lists_all_names() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["catalogue", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OpenClaw"))
        .stdout(predicate::str::contains("Moltbot"))
        .stdout(predicate::str::contains("com.clawdbot.gateway"));
}

#[test]
fn test_catalogue_validate_rejects_short_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("catalogue.toml");
    std::fs::write(
        &file,
        "name_patterns = [\"oc\"]\n\n[product]\nname = \"OpenClaw\"\n",
    )
    .unwrap();
    clawpurge(dir.path())
        .args(["catalogue", "validate"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("too short"));
}

#[test]
fn test_config_set_then_show() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["config", "set", "tail_lines", "25"])
        .assert()
        .success();
    clawpurge(dir.path())
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tail_lines\": 25"));
}

#[test]
fn test_config_set_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["config", "set", "stale_days", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_config_path_honours_env() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ─── Completions ─────────────────────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    clawpurge(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("clawpurge"));
}
