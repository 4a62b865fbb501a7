//! `rxlink`: resolve OCR-extracted medicine names against a catalog.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use rxlink_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    CatalogInfo, Globals, LinkRun, run_import, run_info, run_link, run_search, run_variations,
};
use crate::summary::{
    print_catalog_info, print_csv_info, print_link_report, print_match, print_variations,
};

/// Exit code when `--require-link` aborts a batch.
const EXIT_ABORTED: i32 = 2;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let globals = Globals {
        catalog: cli.catalog.clone(),
        config: cli.config.clone(),
    };
    let outcome = match &cli.command {
        Command::Search(args) => run_search(&globals, args).and_then(|result| {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_match(&args.name, &result);
            }
            Ok(0)
        }),
        Command::Link(args) => run_link(&globals, args).map(|run| match run {
            LinkRun::Linked(report) => {
                print_link_report(&report);
                0
            }
            LinkRun::Aborted(error) => {
                eprintln!("error: {error}");
                EXIT_ABORTED
            }
        }),
        Command::Variations(args) => run_variations(&globals, args).map(|variations| {
            print_variations(args.name.trim(), &variations);
            0
        }),
        Command::Import(args) => run_import(args).map(|count| {
            println!("Imported {count} records into {}", args.db.display());
            0
        }),
        Command::Info => run_info(&globals).and_then(|info| {
            match info {
                CatalogInfo::Csv(catalog) => print_csv_info(&catalog),
                CatalogInfo::Sqlite { path, store } => print_catalog_info(
                    &path.display().to_string(),
                    store.active_count()?,
                    store.schema_version()?,
                    store.metadata()?.as_ref(),
                ),
            }
            Ok(0)
        }),
    };
    let exit_code = match outcome {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
