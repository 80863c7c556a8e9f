pub mod accounts;
pub mod categories;
pub mod demo;
pub mod import;
pub mod init;
pub mod ledger;
pub mod matching;
pub mod review;
pub mod rules;
pub mod status;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{DeskError, Result};
use crate::models::Month;
use crate::settings::get_db_path;

/// `YYYY-MM`, or the current month when absent.
pub(crate) fn parse_month_opt(month: Option<&str>) -> Result<Month> {
    match month {
        Some(m) => m.parse(),
        None => Ok(Month::current()),
    }
}

/// Open the configured database, refusing to create a new file implicitly.
pub(crate) fn open_db() -> Result<Connection> {
    let db_path = get_db_path();
    if !db_path.exists() {
        return Err(DeskError::Other(format!(
            "No database at {}. Run `ledgerdesk init` first.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    Ok(conn)
}

#[derive(Parser)]
#[command(name = "ledgerdesk", about = "Receipt matching and month-end categorization for freelancers.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up ledgerdesk: choose a data directory and initialize the database.
    Init {
        /// Path for ledgerdesk data (default: ~/Documents/ledgerdesk)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Your name, shown in `status`
        #[arg(long)]
        name: Option<String>,
        /// Default tax rate in percent for new drafts
        #[arg(long = "tax-rate")]
        tax_rate: Option<f64>,
    },
    /// Manage bank accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Import bank transactions or receipts from CSV.
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// List transactions of a month.
    Transactions {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// List receipts not yet linked to a transaction.
    Receipts,
    /// Show the category taxonomy.
    Categories,
    /// Manage suggestion rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Show receipt candidates for one transaction.
    Match {
        /// Transaction ID (shown in `ledgerdesk transactions`)
        transaction_id: i64,
    },
    /// Interactively categorize a month's open transactions.
    Review {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Show settings and database summary.
    Status,
    /// Categorization progress for a month.
    Overview {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Transactions flagged as missing a receipt.
    Followups,
    /// Load sample data to explore ledgerdesk.
    Demo,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a bank account.
    Add {
        /// Account name, e.g. 'GLS Business'
        name: String,
        #[arg(long)]
        iban: Option<String>,
        /// Institution name
        #[arg(long)]
        institution: Option<String>,
    },
    /// List all accounts.
    List,
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Bank statement CSV: date,amount,sender,recipient,reference
    Transactions {
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: String,
    },
    /// Receipt CSV: date,vendor,invoice_number,amount[,issue_date]
    Receipts { file: String },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a suggestion rule.
    Add {
        /// Pattern to match against counterparty and reference
        pattern: String,
        /// Category label to suggest
        #[arg(long)]
        category: String,
        /// Match type: contains, starts_with, regex
        #[arg(long = "match-type", default_value = "contains")]
        match_type: String,
        /// Rule priority (higher wins)
        #[arg(long, default_value = "0")]
        priority: i64,
    },
    /// List active suggestion rules.
    List,
    /// Delete (deactivate) a rule by ID.
    Delete {
        /// Rule ID (shown in `ledgerdesk rules list`)
        id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_opt() {
        assert_eq!(parse_month_opt(Some("2025-03")).unwrap(), Month::new(2025, 3).unwrap());
        assert_eq!(parse_month_opt(None).unwrap(), Month::current());
        assert!(matches!(parse_month_opt(Some("March")), Err(DeskError::InvalidMonth(_))));
    }

    #[test]
    fn test_cli_parses_review_month() {
        let cli = Cli::try_parse_from(["ledgerdesk", "review", "--month", "2025-03"]).unwrap();
        assert!(matches!(cli.command, Commands::Review { month: Some(m) } if m == "2025-03"));
    }
}
