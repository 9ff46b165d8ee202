//! Command-line interface for ao_tictactoe.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ao_tictactoe - play tic-tac-toe against ao game processes
#[derive(Parser, Debug)]
#[command(name = "ao_tictactoe")]
#[command(about = "Client for tic-tac-toe games hosted on ao processes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file. Missing file means defaults.
    #[arg(short, long, default_value = "ao_tictactoe.toml")]
    pub config: PathBuf,

    /// Reconciler mode override (`incremental` or `snapshot`)
    #[arg(long)]
    pub poll_mode: Option<ao_tictactoe::PollMode>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a game's state once and print it
    State {
        /// Game process id
        process: String,
    },

    /// Join a game and play from the terminal
    Play {
        /// Game process id
        process: String,

        /// Register the process's bot as the opponent after joining
        #[arg(long)]
        bot: bool,
    },

    /// List games registered on the router
    Games,

    /// Create a new game and register it on the router
    Create {
        /// Game name, unique on the router
        name: String,
    },
}
