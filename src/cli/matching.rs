use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::matcher::{best_match_for, MatchCandidate, MatchResult};
use crate::models::Transaction;
use crate::reviewer::{get_transaction, list_unmatched_receipts};

fn reasons(c: &MatchCandidate) -> String {
    c.reasons.iter().map(|r| r.label.as_str()).collect::<Vec<_>>().join(", ")
}

fn candidate_table(result: &MatchResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["", "Receipt", "Vendor", "Invoice", "Date", "Amount", "Confidence", "Coverage", "Reasons"]);
    let rows = result
        .best_match
        .iter()
        .map(|c| ("best", c))
        .chain(result.other_matches.iter().map(|c| ("other", c)))
        .chain(result.partial_matches.iter().map(|c| ("partial", c)));
    for (kind, c) in rows {
        let coverage = if c.is_partial_match {
            format!("{}%", c.coverage_percent)
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(kind),
            Cell::new(c.receipt.id),
            Cell::new(&c.receipt.vendor_name),
            Cell::new(&c.receipt.invoice_number),
            Cell::new(c.receipt.effective_date()),
            Cell::new(money(c.receipt.amount)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{}%", c.confidence)).set_alignment(CellAlignment::Right),
            Cell::new(coverage).set_alignment(CellAlignment::Right),
            Cell::new(reasons(c)),
        ]);
    }
    table
}

fn print_header(txn: &Transaction) {
    println!(
        "Transaction {}  {}  {}  {}",
        txn.id,
        txn.date,
        txn.counterparty().bold(),
        money(txn.amount)
    );
    if !txn.reference.is_empty() {
        println!("  Reference: {}", txn.reference);
    }
}

pub fn run(transaction_id: i64) -> Result<()> {
    let conn = open_db()?;
    let txn = get_transaction(&conn, transaction_id)?;
    print_header(&txn);

    if txn.has_attachment {
        println!("{}", "Already has a receipt attached.".dimmed());
        return Ok(());
    }

    let pool = list_unmatched_receipts(&conn)?;
    let result = best_match_for(&txn, &pool);
    if result.is_empty() {
        println!("{}", "No receipt candidates.".yellow());
        return Ok(());
    }

    match &result.best_match {
        Some(best) => println!(
            "{} receipt {} from {} ({}%)",
            "Best match:".green().bold(),
            best.receipt.id,
            best.receipt.vendor_name,
            best.confidence
        ),
        None => println!("{}", "No confident match, pick one manually.".yellow()),
    }
    println!("{}", candidate_table(&result));
    Ok(())
}
