//! Command-line interface for game_store.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use game_store::ReferentialPolicy;

/// Game Store - catalog and purchase backend
#[derive(Parser, Debug)]
#[command(name = "game_store")]
#[command(about = "Catalog and purchase backend for a digital game store", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP store server
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file (created if it doesn't exist)
        #[arg(long)]
        database_url: Option<String>,

        /// How purchases and deletes treat unknown or referenced rows
        #[arg(long, value_enum)]
        referential_policy: Option<ReferentialPolicy>,

        /// Do not insert the starter catalog into an empty database
        #[arg(long)]
        no_seed: bool,
    },

    /// Create the schema (and seed the starter catalog) then exit
    InitDb {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the database file (created if it doesn't exist)
        #[arg(long)]
        database_url: Option<String>,

        /// Do not insert the starter catalog into an empty database
        #[arg(long)]
        no_seed: bool,
    },
}
