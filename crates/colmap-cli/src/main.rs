//! colmap CLI.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use colmap_cli::commands::{
    load_config, open_store, run_detect, run_learn, run_submit, run_table,
};
use colmap_cli::logging::{LogConfig, LogFormat, init_logging};
use colmap_core::ColmapConfig;
use colmap_feedback::PatternAnalyzer;
use tracing::level_filters::LevelFilter;

mod cli;
mod summary;

use crate::cli::{Cli, Command, FeedbackCommand, LogFormatArg, LogLevelArg};
use crate::summary::{
    print_corrections, print_detection, print_learning, print_patterns, print_schemas,
    print_stats, print_submitted,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Detect(args) => {
            let detection = run_detect(&args.file)?;
            print_detection(detection.as_ref());
            Ok(if detection.is_some() { 0 } else { 2 })
        }
        Command::Table(args) => {
            let accepted = run_table(&config, &args.file)?;
            let json = serde_json::to_string_pretty(&accepted.outcome)
                .context("serialize mapping outcome")?;
            println!("{json}");
            Ok(if accepted.outcome.review_required { 3 } else { 0 })
        }
        Command::Schemas => {
            print_schemas();
            Ok(0)
        }
        Command::Feedback(command) => run_feedback(&config, command),
    }
}

fn run_feedback(config: &ColmapConfig, command: FeedbackCommand) -> Result<i32> {
    match command {
        FeedbackCommand::Submit(args) => {
            let store = open_store(config, args.store.store.as_deref())?;
            let feedback = run_submit(
                &store,
                &args.request_hash,
                args.rating,
                &args.fixes,
                &args.notes,
                &args.session,
            )?;
            print_submitted(&feedback);
        }
        FeedbackCommand::Stats(args) => {
            let store = open_store(config, args.store.as_deref())?;
            print_stats(&store.stats());
        }
        FeedbackCommand::Patterns(args) => {
            let store = open_store(config, args.store.store.as_deref())?;
            let days = args.days.unwrap_or(config.feedback.window_days);
            let patterns = PatternAnalyzer::new(&store).analyze_patterns(days);
            print_patterns(&patterns, days);
        }
        FeedbackCommand::Corrections(args) => {
            let store = open_store(config, args.store.store.as_deref())?;
            let corrections = PatternAnalyzer::new(&store).get_top_corrections(args.limit);
            print_corrections(&corrections);
        }
        FeedbackCommand::Learn(args) => {
            let store = open_store(config, args.store.store.as_deref())?;
            let days = args.days.unwrap_or(config.feedback.window_days);
            let outcome = run_learn(config, &store, days)?;
            print_learning(&outcome);
        }
    }
    Ok(0)
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
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
