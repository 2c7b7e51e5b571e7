//! # Lapis
//!
//! The command-line entry point for the Lapis interpreter: reads a source
//! file, runs it, and reports diagnostics.

use clap::{Parser as ClapParser, ValueEnum};

#[derive(ClapParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The path to the Lapis source file to run.
    #[arg(index = 1)]
    file: std::path::PathBuf,

    /// Raise the log level. Repeatable: -v, -vv, -vvv.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Default, Debug, ValueEnum)]
enum LogLevel {
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<u8> for LogLevel {
    fn from(count: u8) -> Self {
        match count {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    simple_logger::init_with_level(LogLevel::from(cli.verbose).into()).expect("logger can only be initialized once");

    let content = match std::fs::read_to_string(&cli.file) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("error [LAP9001]: could not read '{}': {e}", cli.file.display());
            std::process::exit(1);
        }
    };

    let (source_map, result) = lapis::run_source(&cli.file.to_string_lossy(), &content);
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            // Every diagnostic this crate constructs is `Severity::Error`; a
            // run either completes or fails, there's no warning-only outcome.
            eprintln!("{}", e.diagnostic.render_compact(&source_map));
            std::process::exit(1);
        }
    }
}
