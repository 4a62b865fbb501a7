//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use rxlink_match::OcrConfusion;

#[derive(Parser)]
#[command(
    name = "rxlink",
    version,
    about = "Resolve OCR-extracted medicine names against a reference catalog",
    long_about = "Resolve free-text medicine names (typically OCR output from \
                  prescriptions) to canonical catalog records.\n\n\
                  Catalogs are CSV files or SQLite databases built with `rxlink import`."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machines).
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

    /// Include medicine names in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Catalog to search: a .csv file or an imported SQLite catalog
    /// (default: $RXLINK_CATALOG).
    #[arg(long = "catalog", value_name = "PATH", global = true)]
    pub catalog: Option<PathBuf>,

    /// Matcher settings in TOML.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a single medicine name.
    Search(SearchArgs),

    /// Link every medicine in a JSON batch file.
    Link(LinkArgs),

    /// Show the search variations generated for a name.
    Variations(VariationsArgs),

    /// Build a SQLite catalog from a CSV file.
    Import(ImportArgs),

    /// Show catalog provenance and size.
    Info,
}

/// Matcher settings shared by `search` and `link`.
#[derive(Args, Clone, Default)]
pub struct MatchArgs {
    /// Minimum confidence for a fuzzy or composition match (0 to 1).
    #[arg(long = "min-similarity", value_name = "SCORE")]
    pub min_similarity: Option<f64>,

    /// Results requested per catalog lookup.
    #[arg(long = "max-results", value_name = "N")]
    pub max_results: Option<usize>,

    /// Per-lookup timeout in milliseconds.
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Skip the exact-name phase.
    #[arg(long = "no-exact")]
    pub no_exact: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Medicine name as read from the prescription.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Salt (composition) text used when the name has no catalog hits.
    #[arg(long = "salt", value_name = "TEXT")]
    pub salt: Option<String>,

    /// Print the result as JSON.
    #[arg(long = "json")]
    pub json: bool,

    #[command(flatten)]
    pub matching: MatchArgs,
}

#[derive(Args)]
pub struct LinkArgs {
    /// JSON file with the medicines to link.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Abort when any medicine cannot be linked (exit code 2).
    #[arg(long = "require-link")]
    pub require_link: bool,

    /// Record medicines without searching the catalog.
    #[arg(long = "no-auto-link")]
    pub no_auto_link: bool,

    /// Link medicines on all cores.
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Write the full report as JSON.
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Hide the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    #[command(flatten)]
    pub matching: MatchArgs,
}

#[derive(Args)]
pub struct VariationsArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// OCR confusion to apply, as MISREAD:REPLACEMENT (e.g. 0:O, 1:I).
    #[arg(long = "ocr", value_name = "PAIR")]
    pub ocr: Option<OcrConfusion>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// CSV catalog to import.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// SQLite catalog to create or replace.
    #[arg(long = "db", value_name = "PATH")]
    pub db: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
