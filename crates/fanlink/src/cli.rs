//! Clap derive structures for the `fanlink` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fanlink -- read and drive an ESP32 fan controller over HTTP
#[derive(Debug, Parser)]
#[command(
    name = "fanlink",
    version,
    about = "Monitor and control an ESP32 fan controller",
    long_about = "Polls an ESP32 fan controller for temperature, humidity, mode,\n\
        servo angle and relay state, and sends mode/angle/relay commands.",
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
    /// Device base URL (overrides config)
    #[arg(long, short = 'd', env = "FANLINK_DEVICE_URL", global = true)]
    pub device_url: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "FANLINK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Status poll timeout in milliseconds
    #[arg(long, global = true)]
    pub poll_timeout_ms: Option<u64>,

    /// Command timeout in milliseconds
    #[arg(long, global = true)]
    pub command_timeout_ms: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
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
    /// Poll the device once and show its state
    #[command(alias = "st")]
    Status,

    /// Keep polling and print changes until interrupted
    Watch(WatchArgs),

    /// Switch between automatic and manual control
    Mode(ModeArgs),

    /// Set the servo angle (manual mode only)
    Angle(AngleArgs),

    /// Switch the fan relay (manual mode only)
    Relay(RelayArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in milliseconds (overrides config)
    #[arg(long, short = 'i')]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ModeArgs {
    pub mode: FanMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FanMode {
    /// Firmware drives the fan from its sensors
    Auto,
    /// Angle and relay follow user commands
    Manual,
}

#[derive(Debug, Args)]
pub struct AngleArgs {
    /// Servo angle in degrees (0-180)
    #[arg(value_parser = clap::value_parser!(u8).range(0..=180))]
    pub angle: u8,
}

#[derive(Debug, Args)]
pub struct RelayArgs {
    pub state: RelayState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RelayState {
    On,
    Off,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file (prompts for the device URL unless
    /// --device-url is given)
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
