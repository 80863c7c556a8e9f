use chrono::NaiveDate;
use rusqlite::Connection;

use crate::cli::open_db;
use crate::error::{DeskError, Result};
use crate::models::Month;

const ACCOUNT_NAME: &str = "Studio Nord Business";
const OWNER: &str = "Studio Nord";

/// Positive amounts are inflows from `counterparty`, negative ones are
/// payments to it.
struct DemoTxn {
    day: u32,
    counterparty: &'static str,
    reference: &'static str,
    amount: f64,
}

const TRANSACTIONS: &[DemoTxn] = &[
    DemoTxn { day: 3, counterparty: "Kunde AG", reference: "Rechnung 2041 Webdesign", amount: 4800.00 },
    DemoTxn { day: 5, counterparty: "Adobe Systems", reference: "Creative Cloud Abo", amount: -66.45 },
    DemoTxn { day: 8, counterparty: "Hetzner Online", reference: "Server R-88312", amount: -38.56 },
    DemoTxn { day: 12, counterparty: "LinkedIn Ireland", reference: "LinkedIn Premium", amount: -79.99 },
    DemoTxn { day: 14, counterparty: "Bauer Consulting", reference: "RE-118 Projekt Relaunch", amount: -16660.00 },
    DemoTxn { day: 18, counterparty: "DB Fernverkehr", reference: "Ticket Hamburg-Berlin", amount: -129.90 },
    DemoTxn { day: 20, counterparty: "Restaurant Umami", reference: "Kundenessen", amount: -84.30 },
    DemoTxn { day: 22, counterparty: "REWE Markt", reference: "", amount: -23.17 },
    DemoTxn { day: 25, counterparty: "Telekom Deutschland", reference: "Mobilfunk 0171", amount: -49.95 },
    DemoTxn { day: 28, counterparty: "GLS Bank", reference: "Kontoführung", amount: -9.90 },
];

struct DemoReceipt {
    day: u32,
    vendor: &'static str,
    invoice_number: &'static str,
    amount: f64,
}

const RECEIPTS: &[DemoReceipt] = &[
    DemoReceipt { day: 5, vendor: "Adobe Systems", invoice_number: "ADB-55120", amount: 66.45 },
    DemoReceipt { day: 1, vendor: "Hetzner Online", invoice_number: "R-88312", amount: 38.56 },
    DemoReceipt { day: 10, vendor: "LinkedIn Ireland", invoice_number: "LI-7781", amount: 79.99 },
    DemoReceipt { day: 11, vendor: "Bauer Consulting", invoice_number: "RE-118", amount: 7140.00 },
    DemoReceipt { day: 17, vendor: "DB Fernverkehr", invoice_number: "TK-4410", amount: 129.90 },
    DemoReceipt { day: 24, vendor: "Telekom Deutschland", invoice_number: "MF-0171-03", amount: 49.95 },
    DemoReceipt { day: 2, vendor: "Office Depot", invoice_number: "OD-1200", amount: 212.40 },
];

fn demo_date(month: Month, day: u32) -> Result<String> {
    NaiveDate::from_ymd_opt(month.year, month.month, day)
        .map(|d| d.to_string())
        .ok_or_else(|| DeskError::Other(format!("invalid demo day {day} in {month}")))
}

fn insert_demo_data(conn: &Connection, month: Month) -> Result<(usize, usize)> {
    conn.execute(
        "INSERT INTO accounts (name, iban, institution) VALUES (?1, 'DE02 4306 0967 0000 0000 00', 'GLS Bank')",
        [ACCOUNT_NAME],
    )?;
    let account_id = conn.last_insert_rowid();

    for txn in TRANSACTIONS {
        let (sender, recipient) = if txn.amount > 0.0 {
            (txn.counterparty, OWNER)
        } else {
            (OWNER, txn.counterparty)
        };
        conn.execute(
            "INSERT INTO transactions (account_id, date, amount, sender, recipient, reference) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![account_id, demo_date(month, txn.day)?, txn.amount, sender, recipient, txn.reference],
        )?;
    }

    for r in RECEIPTS {
        conn.execute(
            "INSERT INTO receipts (vendor_name, invoice_number, amount, date) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![r.vendor, r.invoice_number, r.amount, demo_date(month, r.day)?],
        )?;
    }

    Ok((TRANSACTIONS.len(), RECEIPTS.len()))
}

pub fn run() -> Result<()> {
    let conn = open_db()?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE name = ?1)",
        [ACCOUNT_NAME],
        |r| r.get(0),
    )?;
    if exists {
        println!("Demo data already loaded (account '{ACCOUNT_NAME}' exists).");
        return Ok(());
    }

    let month = Month::current();
    let (txns, receipts) = insert_demo_data(&conn, month)?;

    println!("Demo data loaded for {month}!");
    println!("  Account:      {ACCOUNT_NAME}");
    println!("  Transactions: {txns}");
    println!("  Receipts:     {receipts}");
    println!();
    println!("Try these next:");
    println!("  ledgerdesk transactions");
    println!("  ledgerdesk match <id>");
    println!("  ledgerdesk review");
    println!("  ledgerdesk overview");

    Ok(())
}
