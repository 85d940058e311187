use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// ClawPurge — detect and remove OpenClaw (formerly Moltbot / Clawdbot) from a Mac
#[derive(Parser, Debug)]
#[command(
    name = "clawpurge",
    version,
    about = "Detect and remove OpenClaw, Moltbot and Clawdbot from macOS",
    long_about = "ClawPurge finds every trace of OpenClaw and its former names (Moltbot,\n\
                   Clawdbot) across all local users, removes them, and classifies\n\
                   the result for fleet-management reporting.",
    after_help = "EXAMPLES:\n  \
        sudo clawpurge detect                    Walk the machine, log every trace\n  \
        sudo clawpurge remove --dry-run          Show what removal would do\n  \
        sudo clawpurge remove                    Remove everything found\n  \
        clawpurge classify                       Genuine or false positive?\n  \
        clawpurge tail-check                     Extension-attribute style result\n  \
        clawpurge catalogue show                 Print the built-in catalogue\n  \
        clawpurge config set log_dir /var/log/cp Change the log directory"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory for detection.log and removal.log
    #[arg(long, global = true, env = "CLAWPURGE_LOG_DIR", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// TOML catalogue replacing the built-in one
    #[arg(long, global = true, value_name = "FILE")]
    pub catalogue: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose diagnostics (also written to clawpurge.trace.log)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode, do not echo run log lines
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect every trace of the product (requires root)
    Detect,

    /// Remove every trace of the product (requires root)
    Remove {
        /// Log what would be removed without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Exit with status 2 when the run finishes with warnings or residues
        #[arg(long)]
        strict_exit: bool,
    },

    /// Classify the last detection/removal pair as genuine or false positive
    Classify {
        /// Detection log to read (defaults to <log-dir>/detection.log)
        #[arg(long, value_name = "FILE")]
        detection_log: Option<PathBuf>,

        /// Removal log to read (defaults to <log-dir>/removal.log)
        #[arg(long, value_name = "FILE")]
        removal_log: Option<PathBuf>,
    },

    /// Print a tagged result from the tail of the detection log
    TailCheck {
        /// Log to inspect (defaults to <log-dir>/detection.log)
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,

        /// Number of trailing lines to inspect
        #[arg(long)]
        lines: Option<usize>,
    },

    /// Inspect the product catalogue
    Catalogue {
        #[command(subcommand)]
        action: CatalogueAction,
    },

    /// List the local user accounts a run would cover
    Users,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
pub enum CatalogueAction {
    /// Print the active catalogue as TOML
    Show,

    /// Check a catalogue file for mistakes
    Validate {
        /// Catalogue file
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Print the configuration file path
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Quiet,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
