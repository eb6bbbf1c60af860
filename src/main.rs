//! Main entry point for rowdiff CLI

use clap::Parser;
use rowdiff::cli::Cli;
use rowdiff::commands::execute_command;

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging; --verbose raises the level to debug
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Err(e) = execute_command(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
