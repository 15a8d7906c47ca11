//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "colmap",
    version,
    about = "Adaptive column mapping - detect tables, map columns, learn from feedback",
    long_about = "Detect well-formed tabular input, map its columns onto canonical schemas\n\
                  and turn recurring user corrections into reusable mapping examples."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Detect whether a file is well-formed TSV, Markdown or CSV.
    Detect(InputArgs),

    /// Accept a delimited file as a table and print its mapping as JSON.
    Table(InputArgs),

    /// List canonical schemas and their required fields.
    Schemas,

    /// Record and analyze mapping feedback.
    #[command(subcommand)]
    Feedback(FeedbackCommand),
}

#[derive(Args)]
pub struct InputArgs {
    /// File with pasted tabular content.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Subcommand)]
pub enum FeedbackCommand {
    /// Record a rating for a mapping request.
    Submit(SubmitArgs),

    /// Show rating totals and the recent trend.
    Stats(StoreArgs),

    /// Detect systemic issues in recent feedback.
    Patterns(WindowArgs),

    /// Show the most frequent column corrections.
    Corrections(CorrectionsArgs),

    /// Turn recurring corrections into mapping examples.
    Learn(WindowArgs),
}

#[derive(Args)]
pub struct StoreArgs {
    /// Feedback log (overrides the configured store path).
    #[arg(long = "store", value_name = "PATH")]
    pub store: Option<PathBuf>,
}

#[derive(Args)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Hash of the mapping request being rated.
    #[arg(long = "hash", value_name = "HASH")]
    pub request_hash: String,

    /// 1 for thumbs-down, 5 for thumbs-up.
    #[arg(long = "rating", allow_negative_numbers = true)]
    pub rating: i32,

    /// Column fix as HEADER:WRONG:CORRECT (repeatable).
    #[arg(long = "fix", value_name = "HEADER:WRONG:CORRECT")]
    pub fixes: Vec<String>,

    /// Free-text corrections.
    #[arg(long = "notes", default_value = "")]
    pub notes: String,

    /// Reviewer session id.
    #[arg(long = "session", default_value = "")]
    pub session: String,
}

#[derive(Args)]
pub struct WindowArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Trailing window in days (configured default when omitted).
    #[arg(long = "days")]
    pub days: Option<i64>,
}

#[derive(Args)]
pub struct CorrectionsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Maximum corrections to show.
    #[arg(long = "limit", default_value_t = 10)]
    pub limit: usize,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
