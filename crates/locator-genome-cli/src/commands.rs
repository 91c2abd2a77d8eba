//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ColorChoice;
use crate::output::OutputFormat;

/// Genome: inspect the element evolution knowledge behind self-healing selectors
#[derive(Parser, Debug)]
#[command(name = "genome")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Knowledge file (overrides the config file)
    #[arg(long, env = "GENOME_KNOWLEDGE", global = true)]
    pub knowledge: Option<PathBuf>,

    /// Tracker configuration file (YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "text", global = true)]
    pub format: FormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show store statistics
    Stats,

    /// List tracked elements
    Elements,

    /// Show one element's history and mutation log
    Show(ShowArgs),

    /// Rank an element's selectors by survival probability
    Rank(RankArgs),

    /// Record a raw element snapshot and save the knowledge file
    Capture(CaptureArgs),

    /// Show global heuristics
    Heuristics,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Tracking id of the element
    pub tracking_id: String,
}

/// Arguments for the rank command
#[derive(Parser, Debug)]
pub struct RankArgs {
    /// Tracking id of the element
    pub tracking_id: String,

    /// Show at most this many selectors
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the capture command
#[derive(Parser, Debug)]
pub struct CaptureArgs {
    /// JSON file holding a raw element snapshot
    pub snapshot: PathBuf,

    /// Primary selector the element was located with
    #[arg(short, long)]
    pub selector: String,

    /// Record under this tracking id instead of the derived one
    #[arg(long)]
    pub tracking_id: Option<String>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}
