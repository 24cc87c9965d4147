use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index the notes directory, watch it for changes and serve queries
    Serve,
    /// Rebuild the index snapshot from scratch without starting the server
    Index {
        /// Notes directory (defaults to `notes-root` from the config file)
        root_path: Option<PathBuf>,
    },
    /// Query a running server
    Search {
        query: String,
        /// Only return notes under this folder
        #[arg(short, long)]
        scope: Option<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Ask a running server for completions of a partial word
    Suggest {
        prefix: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete the index snapshot
    ClearCache,
}
