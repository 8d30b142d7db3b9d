//! Clap derive structures for the `matterlink` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// matterlink -- expose platform devices as Matter nodes
#[derive(Debug, Parser)]
#[command(
    name = "matterlink",
    version,
    about = "Inspect Matter bridge configuration and simulate device synchronization",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Settings file (defaults to the platform config dir)
    #[arg(long, env = "MATTERLINK_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Bridge configuration file (overrides settings)
    #[arg(long, short = 'f', global = true)]
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MATTERLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect, validate, and normalize bridge configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Run devices against an in-memory store and log endpoint patches
    #[command(alias = "sim")]
    Simulate(SimulateArgs),
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// List bridges and devices with their commissioning status
    Show,

    /// Validate the configuration file
    Check,

    /// Convert a legacy document (JSON or TOML) into the current shape
    Normalize {
        /// Document to read; `.json` files are parsed as JSON
        input: PathBuf,

        /// Save the result as the bridge configuration file instead of printing it
        #[arg(long)]
        write: bool,
    },

    /// Show the resolved settings and file locations
    Path,
}

// ── Simulate ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Milliseconds to wait after each scripted store update
    #[arg(long, default_value = "20")]
    pub settle_ms: u64,
}
