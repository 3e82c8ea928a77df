// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chatpad")]
#[command(author, version, about = "Drives virtual game controllers from text input commands")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/chatpad/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a message and print the resulting input sequence without executing it
    #[command(visible_alias = "p")]
    Parse {
        /// Console to parse against (defaults to the configured console)
        #[arg(short = 'n', long)]
        console: Option<String>,

        /// The message text (e.g. "_a300ms+b50%500ms #17ms")
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Show a message after repetition, macro, and synonym expansion
    #[command(visible_alias = "e")]
    Expand {
        /// Console whose synonyms to apply (defaults to the configured console)
        #[arg(short = 'n', long)]
        console: Option<String>,

        /// The message text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List known consoles, or show one console's input table
    Consoles {
        /// Console name to show in full
        name: Option<String>,
    },

    /// Manage input macros
    #[command(subcommand)]
    Macros(MacrosCommand),

    /// Run an interactive session driving virtual controllers from stdin
    Run {
        /// Use in-memory controllers instead of uinput devices
        #[arg(long)]
        dry_run: bool,

        /// Console to drive (defaults to the configured console)
        #[arg(short = 'n', long)]
        console: Option<String>,

        /// Caller access level for this session
        #[arg(long)]
        level: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum MacrosCommand {
    /// List stored macros
    #[command(visible_alias = "ls")]
    List,

    /// Add or replace a macro; parameterized names carry an arity marker
    /// (e.g. "#mash(*)" with template "[<0>17ms#17ms]*5")
    Add {
        /// Macro name, starting with '#'
        name: String,
        /// Template text, with <0>, <1>, ... placeholders for arguments
        template: String,
    },

    /// Remove a macro
    #[command(visible_alias = "rm")]
    Remove {
        /// Macro name, including any arity marker
        name: String,
    },
}
