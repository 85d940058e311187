use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use clawpurge::catalogue::Catalogue;
use clawpurge::classifier;
use clawpurge::cleaner::{self, RemovalOptions, RemovalStatus};
use clawpurge::cli::args::{
    CatalogueAction, Cli, Commands, CompletionShell, ConfigAction, OutputFormat,
};
use clawpurge::cli::output;
use clawpurge::common::config::Config;
use clawpurge::common::logging::{self, RunLog};
use clawpurge::common::permissions::{is_root, require_root};
use clawpurge::common::{Host, SystemRunner};
use clawpurge::scanner::{self, RESULT_DETECTED, RESULT_NOT_DETECTED};
use clawpurge::tailcheck::{self, TailResult};
use clawpurge::users;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    // Root-gated commands write nothing, trace file included, until the gate passes
    let trace_dir = match cli.command {
        Commands::Detect | Commands::Remove { .. } if !is_root(&SystemRunner) => None,
        _ => Some(config.log_dir.as_path()),
    };
    let _guard = logging::init_tracing(cli.verbose, trace_dir);

    let result = match cli.command {
        Commands::Detect => cmd_detect(&cli, &config),

        Commands::Remove {
            dry_run,
            strict_exit,
        } => cmd_remove(&cli, &config, dry_run, strict_exit),

        Commands::Classify {
            ref detection_log,
            ref removal_log,
        } => cmd_classify(
            &cli,
            &config,
            detection_log.clone().unwrap_or_else(|| config.detection_log()),
            removal_log.clone().unwrap_or_else(|| config.removal_log()),
        ),

        Commands::TailCheck { ref log, lines } => cmd_tail_check(
            &cli,
            log.clone().unwrap_or_else(|| config.detection_log()),
            lines.unwrap_or(config.tail_lines),
        ),

        Commands::Catalogue { ref action } => cmd_catalogue(&cli, &config, action),

        Commands::Users => cmd_users(&cli, &config),

        Commands::Config { ref action } => cmd_config(&cli, action),

        Commands::Completions { ref shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            let shell = match shell {
                CompletionShell::Bash => clap_complete::Shell::Bash,
                CompletionShell::Zsh => clap_complete::Shell::Zsh,
                CompletionShell::Fish => clap_complete::Shell::Fish,
            };
            clap_complete::generate(shell, &mut cmd, "clawpurge", &mut std::io::stdout());
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Config file plus the `--log-dir` / `CLAWPURGE_LOG_DIR` override
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    Ok(config)
}

fn load_catalogue(cli: &Cli, config: &Config) -> Result<Catalogue> {
    let path = cli.catalogue.as_deref().or(config.catalogue_path.as_deref());
    Catalogue::load(path)
}

/// Run log lines go to stdout only in human mode
fn echo_log(cli: &Cli) -> bool {
    cli.format == OutputFormat::Human && !cli.quiet
}

// ─── Detect ───────────────────────────────────────────────────────────────────

fn cmd_detect(cli: &Cli, config: &Config) -> Result<u8> {
    let runner = SystemRunner;
    require_root(&runner, "detect")?;

    let catalogue = load_catalogue(cli, config)?;
    config.ensure_log_dir()?;
    let mut log = RunLog::open(&config.detection_log(), echo_log(cli))?;

    let local_users = users::discover_local_users(&runner, config.min_uid);
    let host = Host::new(&runner, local_users).with_kept_path(config.log_dir.clone());
    let report = scanner::run_detection(&host, &catalogue, &mut log);

    match cli.format {
        OutputFormat::Human => {
            if !cli.quiet {
                output::print_detection_summary(&report, log.path());
            }
        }
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Quiet => println!(
            "{}",
            if report.detected() {
                RESULT_DETECTED
            } else {
                RESULT_NOT_DETECTED
            }
        ),
    }

    Ok(0)
}

// ─── Remove ───────────────────────────────────────────────────────────────────

fn cmd_remove(cli: &Cli, config: &Config, dry_run: bool, strict_exit: bool) -> Result<u8> {
    let runner = SystemRunner;
    require_root(&runner, "remove")?;

    let catalogue = load_catalogue(cli, config)?;
    config.ensure_log_dir()?;
    let mut log = RunLog::open(&config.removal_log(), echo_log(cli))?;

    let local_users = users::discover_local_users(&runner, config.min_uid);
    let host = Host::new(&runner, local_users).with_kept_path(config.log_dir.clone());
    let opts = RemovalOptions {
        dry_run,
        quit_grace: Duration::from_secs(config.quit_grace_secs),
    };
    let report = cleaner::run_removal(&host, &catalogue, &opts, &mut log);

    match cli.format {
        OutputFormat::Human => {
            if !cli.quiet {
                output::print_removal_summary(&report, log.path());
            }
        }
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Quiet => println!("STATUS: {}", report.status()),
    }

    if strict_exit && report.status() == RemovalStatus::PartialWithWarnings {
        return Ok(2);
    }
    Ok(0)
}

// ─── Classify ─────────────────────────────────────────────────────────────────

fn cmd_classify(
    cli: &Cli,
    config: &Config,
    detection_log: std::path::PathBuf,
    removal_log: std::path::PathBuf,
) -> Result<u8> {
    let catalogue = load_catalogue(cli, config)?;
    let result =
        classifier::classify_files(&detection_log, &removal_log, &catalogue.fingerprints)?;

    match cli.format {
        OutputFormat::Human => output::print_classification(&result),
        OutputFormat::Json => output::print_json(&result),
        OutputFormat::Quiet => output::print_classification_quiet(&result),
    }

    Ok(result.exit_code() as u8)
}

// ─── Tail check ───────────────────────────────────────────────────────────────

fn cmd_tail_check(cli: &Cli, log: std::path::PathBuf, lines: usize) -> Result<u8> {
    let result = tailcheck::check(&log, lines).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "tail check could not read the log");
        TailResult::LogNotFound
    });
    output::print_tail_result(result, cli.format == OutputFormat::Json);
    Ok(0)
}

// ─── Catalogue ────────────────────────────────────────────────────────────────

fn cmd_catalogue(cli: &Cli, config: &Config, action: &CatalogueAction) -> Result<u8> {
    match action {
        CatalogueAction::Show => {
            let catalogue = load_catalogue(cli, config)?;
            match cli.format {
                OutputFormat::Json => output::print_json(&catalogue),
                _ => print!("{}", catalogue.to_toml()?),
            }
            Ok(0)
        }
        CatalogueAction::Validate { file } => {
            let catalogue = Catalogue::load(Some(file.as_path()))?;
            if !cli.quiet {
                println!(
                    "  {} {} is valid ({})",
                    "✓".green(),
                    file.display(),
                    catalogue.all_names().join(", ")
                );
            }
            Ok(0)
        }
    }
}

// ─── Users ────────────────────────────────────────────────────────────────────

fn cmd_users(cli: &Cli, config: &Config) -> Result<u8> {
    let local_users = users::discover_local_users(&SystemRunner, config.min_uid);
    match cli.format {
        OutputFormat::Human => output::print_users(&local_users),
        OutputFormat::Json => output::print_json(&local_users),
        OutputFormat::Quiet => {
            for user in &local_users {
                println!("{}", user.username);
            }
        }
    }
    Ok(0)
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(cli: &Cli, action: &ConfigAction) -> Result<u8> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            match cli.format {
                OutputFormat::Human => output::print_config(&config, &Config::config_path()),
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Quiet => print!("{}", toml::to_string_pretty(&config)?),
            }
        }
        ConfigAction::Init => {
            let path = Config::config_path();
            if path.exists() {
                println!("  {} Config already exists at {}", "•".dimmed(), path.display());
            } else {
                Config::default().save()?;
                println!("  {} Wrote default config to {}", "✓".green(), path.display());
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("  {} Set {} = {}", "✓".green(), key, value);
        }
        ConfigAction::Path => println!("{}", Config::config_path().display()),
    }
    Ok(0)
}
