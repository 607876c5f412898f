//! Clap derive structures for the `autofeed` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// autofeed -- remote control for a networked pet feeder
#[derive(Debug, Parser)]
#[command(
    name = "autofeed",
    version,
    about = "Feed, water, and monitor your pet feeder from the command line",
    long_about = "Talks to the AutoFeed device service over HTTP.\n\n\
        Set the device once with `autofeed config set device_id <ID>`,\n\
        then use `status`, `feed`, `water`, `refill`, and `schedules`.",
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
    /// Device service URL (overrides config file)
    #[arg(long, short = 'u', env = "AUTOFEED_SERVICE_URL", global = true)]
    pub service_url: Option<String>,

    /// Request timeout in seconds (overrides config file)
    #[arg(long, env = "AUTOFEED_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Config file to use instead of the platform default
    #[arg(long, env = "AUTOFEED_CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Local settings file (device id, camera address)
    #[arg(long, env = "AUTOFEED_SETTINGS_FILE", global = true)]
    pub settings_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "AUTOFEED_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "AUTOFEED_INSECURE", global = true)]
    pub insecure: bool,
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
    /// YAML
    Yaml,
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
    /// Fetch and show the device's current status
    #[command(alias = "st")]
    Status,

    /// Follow device status live until Ctrl-C
    Watch,

    /// Dispense food
    Feed {
        /// Amount in grams
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        grams: u32,
    },

    /// Dispense water
    Water {
        /// Amount in millilitres
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        ml: u32,
    },

    /// Mark the food container as refilled
    Refill,

    /// Manage daily feeding schedules
    #[command(alias = "sched")]
    Schedules(SchedulesArgs),

    /// Show recent feedings
    History {
        /// Show at most this many entries
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Show grams dispensed per day over the last week
    Analytics,

    /// Check the device service's health
    Health,

    /// Manage configuration and local settings
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Schedules ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SchedulesArgs {
    #[command(subcommand)]
    pub command: SchedulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SchedulesCommand {
    /// List all schedules
    #[command(alias = "ls")]
    List,

    /// Add a daily feeding
    Add {
        /// Time of day, 24-hour HH:MM
        time: String,

        /// Amount in grams
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        grams: u32,
    },

    /// Remove a schedule
    #[command(alias = "rm")]
    Remove {
        /// Schedule ID (see `schedules list`)
        id: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration and local settings
    Show,

    /// Set a value: `device_id`, `camera_ip`, or a dotted config key
    Set {
        /// Key (e.g. device_id, service.url, device.poll_interval_ms)
        key: String,
        value: String,
    },

    /// Print the config and settings file paths
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
