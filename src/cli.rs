//! Command-line interface definitions for newsagg.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The config path can also come from the `NEWSAGG_CONFIG` environment
//! variable.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;

/// Command-line arguments for newsagg.
///
/// # Examples
///
/// ```sh
/// # Ten most viewed articles per site
/// newsagg
///
/// # Three per site, as JSON, with previews from the article pages
/// newsagg -n 3 --format json --fetch-previews
///
/// # Web view on port 5000
/// newsagg serve --addr 127.0.0.1:5000
/// ```
#[derive(Parser, Debug)]
#[command(author, about, disable_version_flag = true)]
pub struct Cli {
    /// Number of items per source (defaults to the configured default)
    #[arg(short = 'n', long = "top", allow_negative_numbers = true, global = true)]
    pub top: Option<i64>,

    /// Output format for the listing
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional path to a YAML source configuration
    #[arg(short, long, env = "NEWSAGG_CONFIG", global = true)]
    pub config: Option<String>,

    /// Visit article pages to fill in missing previews and images
    #[arg(long, global = true)]
    pub fetch_previews: bool,

    /// Print version and file locations, then exit
    #[arg(short = 'V', long)]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the aggregated listing as an HTML page
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
