use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{open_db, parse_month_opt};
use crate::error::Result;
use crate::fmt::money;
use crate::models::Transaction;
use crate::reviewer::{list_follow_ups, list_transactions, list_unmatched_receipts};

fn transaction_table(txns: &[Transaction]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Counterparty", "Reference", "Amount", "Category", "Receipt"]);
    for t in txns {
        let category = match (&t.category, t.categorized_by) {
            (Some(c), Some(by)) => format!("{c} ({})", by.as_str()),
            (Some(c), None) => c.clone(),
            (None, _) => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(t.date),
            Cell::new(t.counterparty()),
            Cell::new(&t.reference),
            Cell::new(money(t.amount)).set_alignment(CellAlignment::Right),
            Cell::new(category),
            Cell::new(if t.has_attachment { "yes" } else { "" }),
        ]);
    }
    table
}

pub fn transactions(month: Option<&str>) -> Result<()> {
    let month = parse_month_opt(month)?;
    let conn = open_db()?;
    let txns = list_transactions(&conn, Some(month))?;
    if txns.is_empty() {
        println!("No transactions in {month}.");
        return Ok(());
    }
    println!("Transactions {month}\n{}", transaction_table(&txns));
    Ok(())
}

pub fn receipts() -> Result<()> {
    let conn = open_db()?;
    let receipts = list_unmatched_receipts(&conn)?;
    if receipts.is_empty() {
        println!("No unmatched receipts.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Issued", "Vendor", "Invoice", "Amount"]);
    for r in receipts {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(r.date),
            Cell::new(r.issue_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(r.vendor_name),
            Cell::new(r.invoice_number),
            Cell::new(money(r.amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Unmatched receipts\n{table}");
    Ok(())
}

pub fn followups() -> Result<()> {
    let conn = open_db()?;
    let txns = list_follow_ups(&conn)?;
    if txns.is_empty() {
        println!("No transactions waiting for a receipt.");
        return Ok(());
    }
    println!("Waiting for a receipt\n{}", transaction_table(&txns));
    Ok(())
}
