use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate api docs in markdown format
    #[cfg(feature = "markdown-docs")]
    #[clap(hide = true)]
    MarkdownDocs {},

    /// Parse a query string into a filter condition
    Parse {
        /// URL-encoded query string, e.g. "q=age%3E%3D30&gcond=a%7Cb"
        query: String,

        /// Schema file (yaml)
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Record whose column types drive value coercion.
        /// Falls back to the config's default_record.
        #[clap(short, long)]
        record: Option<String>,

        /// Also print the rendered condition and every ignored filter
        #[clap(short, long, default_value = "false")]
        explain: bool,
    },

    /// Show the filter tokens of a query string, grouped
    Tokens {
        /// URL-encoded query string
        query: String,
    },
}
