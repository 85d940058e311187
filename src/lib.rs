//! # ClawPurge
//!
//! Detection and removal of OpenClaw, formerly shipped as Moltbot and before
//! that as Clawdbot, from managed Macs.
//!
//! - **Detection**: walks processes, launchd services, app bundles, CLI
//!   binaries, npm and Homebrew packages, config and data directories, and
//!   installer receipts for every local user, logging one `FOUND:` line per trace
//! - **Removal**: native uninstall first, then processes, services, files and
//!   receipts, then a verification pass that tallies residues
//! - **Classification**: tells a genuine detection apart from the npm
//!   list-query false positive by reading both run logs
//! - **Tail check**: a one-line tagged result for fleet-management agents

pub mod apps;
pub mod catalogue;
pub mod classifier;
pub mod cleaner;
pub mod cli;
pub mod common;
pub mod pkgmgr;
pub mod processes;
pub mod scanner;
pub mod services;
pub mod tailcheck;
pub mod users;
