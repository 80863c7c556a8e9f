mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod matcher;
mod models;
mod reviewer;
mod session;
mod settings;
mod suggest;
mod tui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{AccountsCommands, Cli, Commands, ImportCommands, RulesCommands};
use importer::ImportKind;

fn main() {
    // logs on stderr, command output on stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            name,
            tax_rate,
        } => cli::init::run(data_dir, name, tax_rate),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add {
                name,
                iban,
                institution,
            } => cli::accounts::add(&name, iban.as_deref(), institution.as_deref()),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Import { command } => match command {
            ImportCommands::Transactions { file, account } => {
                cli::import::run(ImportKind::Transactions, &file, Some(account.as_str()))
            }
            ImportCommands::Receipts { file } => cli::import::run(ImportKind::Receipts, &file, None),
        },
        Commands::Transactions { month } => cli::ledger::transactions(month.as_deref()),
        Commands::Receipts => cli::ledger::receipts(),
        Commands::Categories => cli::categories::list(),
        Commands::Rules { command } => match command {
            RulesCommands::Add {
                pattern,
                category,
                match_type,
                priority,
            } => cli::rules::add(&pattern, &category, &match_type, priority),
            RulesCommands::List => cli::rules::list(),
            RulesCommands::Delete { id } => cli::rules::delete(id),
        },
        Commands::Match { transaction_id } => cli::matching::run(transaction_id),
        Commands::Review { month } => cli::review::run(month.as_deref()),
        Commands::Status => cli::status::run(),
        Commands::Overview { month } => cli::status::overview(month.as_deref()),
        Commands::Followups => cli::ledger::followups(),
        Commands::Demo => cli::demo::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
