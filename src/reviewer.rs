use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::{DeskError, Result};
use crate::models::{BankAccount, CategorizedBy, Category, Month, Receipt, Rule, Transaction};
use crate::session::record::{Assignment, SessionEvent};
use crate::session::Catalog;

const TXN_COLUMNS: &str = "id, date, amount, sender, recipient, reference, account_id, \
     category, categorized_by, has_attachment, is_private";

const RECEIPT_COLUMNS: &str = "id, vendor_name, invoice_number, amount, date, issue_date, matched";

fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn txn_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    let date: String = row.get(1)?;
    let categorized_by: Option<String> = row.get(8)?;
    Ok(Transaction {
        id: row.get(0)?,
        date: parse_date(1, &date)?,
        amount: row.get(2)?,
        sender: row.get(3)?,
        recipient: row.get(4)?,
        reference: row.get(5)?,
        bank_id: row.get(6)?,
        category: row.get(7)?,
        categorized_by: categorized_by.as_deref().and_then(CategorizedBy::parse),
        has_attachment: row.get(9)?,
        is_private: row.get(10)?,
    })
}

fn receipt_from_row(row: &Row) -> rusqlite::Result<Receipt> {
    let date: String = row.get(4)?;
    let issue_date: Option<String> = row.get(5)?;
    Ok(Receipt {
        id: row.get(0)?,
        vendor_name: row.get(1)?,
        invoice_number: row.get(2)?,
        amount: row.get(3)?,
        date: parse_date(4, &date)?,
        issue_date: issue_date.map(|d| parse_date(5, &d)).transpose()?,
        matched: row.get(6)?,
    })
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub fn list_accounts(conn: &Connection) -> Result<Vec<BankAccount>> {
    let mut stmt = conn.prepare("SELECT id, name, iban, institution FROM accounts ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BankAccount {
                id: row.get(0)?,
                name: row.get(1)?,
                iban: row.get(2)?,
                institution: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_account_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM accounts WHERE name = ?1", [name], |row| row.get(0))
        .optional()?
        .ok_or_else(|| DeskError::UnknownAccount(name.to_string()))
}

pub fn add_account(conn: &Connection, name: &str, iban: Option<&str>, institution: Option<&str>) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (name, iban, institution) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, iban, institution],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Transactions and receipts
// ---------------------------------------------------------------------------

pub fn list_transactions(conn: &Connection, month: Option<Month>) -> Result<Vec<Transaction>> {
    let rows = match month {
        Some(m) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TXN_COLUMNS} FROM transactions WHERE date BETWEEN ?1 AND ?2 ORDER BY date, id"
            ))?;
            let rows = stmt
                .query_map(
                    rusqlite::params![m.first_day().to_string(), m.last_day().to_string()],
                    txn_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!("SELECT {TXN_COLUMNS} FROM transactions ORDER BY date, id"))?;
            let rows = stmt
                .query_map([], txn_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(
        &format!("SELECT {TXN_COLUMNS} FROM transactions WHERE id = ?1"),
        [id],
        txn_from_row,
    )
    .optional()?
    .ok_or(DeskError::UnknownTransaction(id))
}

pub fn list_transactions_needing_categorization(conn: &Connection, month: Month) -> Result<Vec<Transaction>> {
    Ok(list_transactions(conn, Some(month))?
        .into_iter()
        .filter(|t| t.category.is_none())
        .collect())
}

pub fn list_follow_ups(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TXN_COLUMNS} FROM transactions WHERE needs_receipt = 1 AND has_attachment = 0 ORDER BY date, id"
    ))?;
    let rows = stmt
        .query_map([], txn_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_unmatched_receipts(conn: &Connection) -> Result<Vec<Receipt>> {
    let mut stmt = conn.prepare(&format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE matched = 0 ORDER BY id"))?;
    let rows = stmt
        .query_map([], receipt_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Taxonomy and rules
// ---------------------------------------------------------------------------

pub fn get_taxonomy(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, label, icon, path FROM categories WHERE is_active = 1 ORDER BY path, label")?;
    let raw: Vec<(String, String, String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    raw.into_iter()
        .map(|(id, label, icon, path)| -> Result<Category> {
            Ok(Category {
                id,
                label,
                icon,
                path: serde_json::from_str(&path)?,
            })
        })
        .collect()
}

pub fn get_rules(conn: &Connection) -> Result<Vec<Rule>> {
    let mut stmt = conn.prepare(
        "SELECT id, pattern, match_type, category, priority FROM rules \
         WHERE is_active = 1 ORDER BY priority DESC, id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Rule {
                id: row.get(0)?,
                pattern: row.get(1)?,
                match_type: row.get(2)?,
                category: row.get(3)?,
                priority: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    Ok(Catalog {
        taxonomy: get_taxonomy(conn)?,
        rules: get_rules(conn)?,
    })
}

// ---------------------------------------------------------------------------
// Applying session events
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
pub struct ApplyResult {
    pub categorized: usize,
    pub linked: usize,
    pub flagged: usize,
}

/// Write the outcome of a review pass. All events land in one SQL
/// transaction.
pub fn apply_events(conn: &mut Connection, events: &[SessionEvent]) -> Result<ApplyResult> {
    let tx = conn.transaction()?;
    let mut result = ApplyResult::default();

    for event in events {
        match event {
            SessionEvent::Categorized { transaction_id, record } => {
                let changed = tx.execute(
                    "UPDATE transactions SET category = ?1, categorized_by = ?2, is_private = ?3, \
                     note = ?4, tax_rate = ?5 WHERE id = ?6",
                    rusqlite::params![
                        record.primary_category(),
                        record.categorized_by.as_str(),
                        record.is_private(),
                        (!record.note.is_empty()).then_some(record.note.as_str()),
                        record.tax_rate,
                        transaction_id,
                    ],
                )?;
                if changed == 0 {
                    return Err(DeskError::UnknownTransaction(*transaction_id));
                }
                tx.execute("DELETE FROM splits WHERE transaction_id = ?1", [transaction_id])?;
                if let Assignment::Split(lines) = &record.assignment {
                    for line in lines {
                        tx.execute(
                            "INSERT INTO splits (transaction_id, category, percentage, amount) VALUES (?1, ?2, ?3, ?4)",
                            rusqlite::params![transaction_id, line.category, line.percentage, line.amount],
                        )?;
                    }
                }
                result.categorized += 1;
            }
            SessionEvent::ReceiptLinked { transaction_id, receipt_id } => {
                let changed = tx.execute(
                    "UPDATE receipts SET matched = 1, transaction_id = ?1 WHERE id = ?2 AND matched = 0",
                    rusqlite::params![transaction_id, receipt_id],
                )?;
                if changed == 0 {
                    // already consumed elsewhere; leave the transaction without it
                    debug!(receipt_id, transaction_id, "receipt no longer available");
                    continue;
                }
                tx.execute(
                    "UPDATE transactions SET has_attachment = 1, needs_receipt = 0 WHERE id = ?1",
                    [transaction_id],
                )?;
                result.linked += 1;
            }
            SessionEvent::FollowUp { transaction_id } => {
                tx.execute("UPDATE transactions SET needs_receipt = 1 WHERE id = ?1", [transaction_id])?;
                result.flagged += 1;
            }
        }
    }

    tx.commit()?;
    info!(
        categorized = result.categorized,
        linked = result.linked,
        flagged = result.flagged,
        "applied review"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
pub struct MonthOverview {
    pub total: i64,
    pub uncategorized: i64,
    pub by_ai: i64,
    pub manual: i64,
    pub with_attachment: i64,
    pub follow_up: i64,
    pub inflow: f64,
    pub outflow: f64,
}

pub fn month_overview(conn: &Connection, month: Month) -> Result<MonthOverview> {
    let overview = conn.query_row(
        "SELECT count(*), \
                COALESCE(SUM(category IS NULL), 0), \
                COALESCE(SUM(categorized_by = 'ai'), 0), \
                COALESCE(SUM(categorized_by = 'manual'), 0), \
                COALESCE(SUM(has_attachment = 1), 0), \
                COALESCE(SUM(needs_receipt = 1 AND has_attachment = 0), 0), \
                COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0), \
                COALESCE(SUM(CASE WHEN amount < 0 THEN amount ELSE 0 END), 0) \
         FROM transactions WHERE date BETWEEN ?1 AND ?2",
        rusqlite::params![month.first_day().to_string(), month.last_day().to_string()],
        |row| {
            Ok(MonthOverview {
                total: row.get(0)?,
                uncategorized: row.get(1)?,
                by_ai: row.get(2)?,
                manual: row.get(3)?,
                with_attachment: row.get(4)?,
                follow_up: row.get(5)?,
                inflow: row.get(6)?,
                outflow: row.get(7)?,
            })
        },
    )?;
    Ok(overview)
}
