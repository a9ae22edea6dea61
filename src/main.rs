//! sbrowse - A source-code browser for directory trees and working copies
//!
//! sbrowse provides:
//! - HTML pages for directories and files, every identifier linked to a search
//! - Symbol search with highlighted matches and a related-symbols summary
//! - Plain filesystem, Git, Subversion and combined (mounted) backends
//! - An HTTP server and stdout rendering for the same pages

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod backends;
mod cli;
mod core;
mod flows;
mod server;

/// Diagnostics go to stderr; stdout carries pages and path listings.
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // Check for unsupported platforms
    #[cfg(windows)]
    {
        eprintln!("Error: Windows is not supported. Please use WSL (not guaranteed to work).");
        std::process::exit(1);
    }

    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    cli::run(cli)
}
