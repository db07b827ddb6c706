//! CLI module for S.C.R.I.B.E
//!
//! Provides command-line interface parsing for the scribe-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// S.C.R.I.B.E - Streaming deep-research server
///
/// Plans web searches for a question, runs them concurrently and writes a
/// cited markdown report, streaming progress as it goes.
#[derive(Parser, Debug)]
#[command(
    name = "scribe-server",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "S.C.R.I.B.E - Streaming deep-research server",
    long_about = "Plans web searches for a question, runs them concurrently, renumbers their\n\
                  citations and writes a structured markdown report.\n\n\
                  Run without arguments to start the server, or use 'research' to run one\n\
                  question in the terminal.",
    after_help = "EXAMPLES:\n    \
                  scribe-server                              # Start the server (scribe.toml)\n    \
                  scribe-server --config my.toml serve       # Use a custom config file\n    \
                  scribe-server research \"best budget NAS\"   # Research in the terminal\n    \
                  scribe-server config --validate            # Check the configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "scribe.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Research one question and print the report
    Research {
        /// The question to research
        query: String,

        /// Print the final result as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and exit
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
