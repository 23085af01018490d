//! Command-line interface definitions for the `stevedore` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `stevedore` binary.
#[derive(Debug, Parser)]
#[command(
    name = "stevedore",
    version,
    about = "Apply machine manifests and keep their volumes attached as declared",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Log provider calls and polling at debug level.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    /// Subcommand to run.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Subcommands of `stevedore`.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Create the machine or bring it in line with the manifest.
    #[command(name = "apply", about = "Create or update the machine described by a manifest")]
    Apply(ManifestArgs),
    /// Delete the machine recorded for the manifest.
    #[command(name = "destroy", about = "Delete the machine recorded for a manifest")]
    Destroy(ManifestArgs),
    /// Print the machine recorded for the manifest.
    #[command(name = "show", about = "Show the machine recorded for a manifest")]
    Show(ManifestArgs),
    /// Wait again for an operation whose earlier wait timed out.
    #[command(name = "wait", about = "Wait for a provider operation to finish")]
    Wait(WaitArgs),
}

/// Arguments shared by the manifest-driven subcommands.
#[derive(Debug, Args)]
pub(crate) struct ManifestArgs {
    /// Path to the machine manifest (TOML).
    #[arg(value_name = "MANIFEST")]
    pub(crate) manifest: String,
    /// Where applied state is kept. Defaults to `<manifest stem>.state.toml`
    /// next to the manifest.
    #[arg(long, value_name = "PATH")]
    pub(crate) state: Option<String>,
}

/// Arguments for `stevedore wait`.
#[derive(Debug, Args)]
pub(crate) struct WaitArgs {
    /// Handle printed by the command that timed out.
    #[arg(value_name = "OPERATION_ID")]
    pub(crate) operation_id: String,
    /// Region the operation runs in. Defaults to the configured region.
    #[arg(long, value_name = "REGION")]
    pub(crate) region: Option<String>,
}
