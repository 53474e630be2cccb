use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::records::Collection;

fn parse_collection(raw: &str) -> Result<Collection, String> {
    Collection::from_str(raw)
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start dovidka as a service.
    Daemon {},

    /// Search records by meaning
    Search {
        /// Free-text query
        query: String,

        /// Collection searched first; the other one is always consulted for
        /// a handful of extra results
        #[clap(short, long, default_value = "news", value_parser = parse_collection)]
        collection: Collection,

        /// Number of primary results (capped at 20)
        #[clap(short = 'n', long, default_value = "5")]
        top: usize,
    },

    /// Add a record
    Add {
        #[clap(short, long, default_value = "news", value_parser = parse_collection)]
        collection: Collection,

        /// Record description
        #[clap(short, long)]
        description: String,

        /// Path to the screenshot image
        #[clap(short, long)]
        screenshot: PathBuf,

        /// Link to the original source
        #[clap(short, long)]
        original_link: String,

        /// Additional links, free-form
        #[clap(short, long, default_value = "")]
        additional_links: String,
    },

    /// List records of a collection
    List {
        #[clap(short, long, default_value = "news", value_parser = parse_collection)]
        collection: Collection,

        /// Show the archived records instead of the active ones
        #[clap(long, default_value = "false")]
        archived: bool,
    },

    /// Move a record to the archive (restorable later)
    Archive {
        #[clap(short, long, default_value = "news", value_parser = parse_collection)]
        collection: Collection,

        /// Record id
        id: u64,

        /// Skip the confirmation prompt
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Restore an archived record
    Restore {
        #[clap(short, long, default_value = "news", value_parser = parse_collection)]
        collection: Collection,

        /// Record id
        id: u64,
    },

    /// Bundle databases, config and screenshots into a tar.gz archive
    Backup {
        /// Output path; defaults to a timestamped file, or stdout when piped
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Set the curator password used to gate add/archive/restore
    SetPassword {},
}
