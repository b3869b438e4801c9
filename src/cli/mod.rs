pub mod accounts;
pub mod categories;
pub mod categorize;
pub mod demo;
pub mod init;
pub mod review;
pub mod status;

use clap::{Parser, Subcommand};

use crate::error::{PennyError, Result};
use crate::settings::{load_settings, Settings};
use crate::store::SqliteStore;

/// Load settings and open the database, which must already exist.
pub(crate) fn open_store() -> Result<(Settings, SqliteStore)> {
    let settings = load_settings()?;
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(PennyError::Other(
            "No database found. Run `penny init` first.".to_string(),
        ));
    }
    let store = SqliteStore::open(&db_path)?;
    Ok((settings, store))
}

#[derive(Parser)]
#[command(name = "penny", about = "Categorize personal transactions, by model or by hand.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for penny data (default: ~/Documents/penny)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Flag transfers and categorize transactions with the configured model.
    Categorize {
        /// Re-categorize every transaction, not only uncategorized ones
        #[arg(long)]
        all: bool,
        /// Print suggestions without writing them
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Review and categorize transactions interactively.
    Review {
        /// Only show transactions from this account id
        #[arg(long)]
        account: Option<String>,
        /// Earliest posted date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest posted date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Show accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Load sample accounts and transactions to explore penny.
    Demo,
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        /// Category name, e.g. 'Pets'
        name: String,
        /// Mark as internal (used for transfers and adjustments)
        #[arg(long)]
        internal: bool,
    },
    /// List all categories.
    List,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List all accounts.
    List,
}
