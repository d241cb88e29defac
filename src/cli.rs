use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "boardwalk", version, about = "Terminal kanban board backed by SQLite")]
pub struct Cli {
    /// SQLite database file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Board id to open
    #[arg(long, global = true)]
    pub board: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and the board
    Init {
        /// Board title (defaults to the configured title)
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the board as text
    Show,
    /// Append a list to the board
    AddList {
        /// Title of the list
        title: String,
    },
    /// Add a card to a list
    Add {
        /// Title of the card
        title: String,
        /// List position, starting at 1 (defaults to the first list)
        #[arg(long)]
        list: Option<usize>,
        /// Card description
        #[arg(long)]
        description: Option<String>,
        /// Due date in YYYY-MM-DD format
        #[arg(long)]
        due: Option<String>,
    },
    /// Edit a card in place
    Edit {
        /// List position, starting at 1
        list: usize,
        /// Card position within the list, starting at 1
        card: usize,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },
    /// Move a card to the end of another list
    Move {
        /// List position, starting at 1
        list: usize,
        /// Card position within the list, starting at 1
        card: usize,
        /// Destination list position
        to: usize,
    },
    /// Delete a card
    Remove {
        /// List position, starting at 1
        list: usize,
        /// Card position within the list, starting at 1
        card: usize,
    },
    /// Rename a list
    RenameList {
        /// List position, starting at 1
        list: usize,
        /// New list title
        title: String,
    },
    /// Rename the board
    Rename {
        /// New board title
        title: String,
    },
    /// Launch the interactive TUI
    Tui,
}
