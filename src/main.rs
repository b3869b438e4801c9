mod browser;
mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod gateway;
mod logging;
mod models;
mod prompts;
mod resolver;
mod settings;
mod store;
mod tui;

use clap::Parser;

use cli::{AccountsCommands, CategoriesCommands, Cli, Commands};

/// The review session owns the terminal, so it logs to a file. If that file
/// cannot be opened the session runs without logging.
fn init_logging(command: &Commands) {
    if matches!(command, Commands::Review { .. }) {
        if let Ok(settings) = settings::load_settings() {
            let path = settings.log_path();
            if let Err(e) = logging::init_file(&path) {
                eprintln!("Logging disabled: cannot open {}: {e}", path.display());
            }
        }
        return;
    }
    logging::init_stderr();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.command);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Categorize { all, dry_run } => cli::categorize::run(all, dry_run),
        Commands::Review { account, from, to } => cli::review::run(account, from, to),
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { name, internal } => cli::categories::add(&name, internal),
            CategoriesCommands::List => cli::categories::list(),
        },
        Commands::Accounts { command } => match command {
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Demo => cli::demo::run(),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
