use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{DeskError, Result};
use crate::reviewer::find_account_id;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse `1234.56`, `1.234,56`, `-79,99`, `€ 12.00` or `(50.00)`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{20ac}' && *c != '"')
        .collect();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_amount(inner).map(|v| -v.abs());
    }
    let normalized = match (s.rfind(','), s.rfind('.')) {
        // comma is the decimal separator when it comes last
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => s.replace(',', "."),
        _ => s,
    };
    normalized.parse().ok().filter(|v: &f64| v.is_finite())
}

/// ISO `2025-03-12` or German `12.03.2025`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
        .ok()
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImportKind {
    Transactions,
    Receipts,
}

impl ImportKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Receipts => "receipts",
        }
    }
}

pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub invalid: usize,
    pub duplicate_file: bool,
}

impl ImportResult {
    fn duplicate() -> Self {
        Self {
            imported: 0,
            skipped: 0,
            invalid: 0,
            duplicate_file: true,
        }
    }
}

fn already_imported(conn: &Connection, kind: ImportKind, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND kind = ?2")?;
    Ok(stmt.exists(rusqlite::params![checksum, kind.key()])?)
}

fn record_import(conn: &Connection, file_path: &Path, kind: ImportKind, count: usize, checksum: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO imports (filename, kind, record_count, checksum) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            kind.key(),
            count as i64,
            checksum,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn reader(file_path: &Path) -> Result<csv::Reader<std::fs::File>> {
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(file_path)?)
}

// ---------------------------------------------------------------------------
// Bank transactions: date,amount,sender,recipient,reference
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TransactionRow {
    date: String,
    amount: String,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    recipient: String,
    #[serde(default)]
    reference: String,
}

pub fn import_transactions(conn: &Connection, file_path: &Path, account_name: &str) -> Result<ImportResult> {
    let account_id = find_account_id(conn, account_name)?;
    let checksum = compute_checksum(file_path)?;
    if already_imported(conn, ImportKind::Transactions, &checksum)? {
        return Ok(ImportResult::duplicate());
    }

    let mut rows = Vec::new();
    let mut invalid = 0usize;
    for (line, result) in reader(file_path)?.deserialize::<TransactionRow>().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(line = line + 2, error = %e, "unreadable transaction row");
                invalid += 1;
                continue;
            }
        };
        match (parse_date(&row.date), parse_amount(&row.amount)) {
            (Some(date), Some(amount)) => rows.push((date, amount, row)),
            _ => {
                warn!(line = line + 2, date = %row.date, amount = %row.amount, "invalid transaction row");
                invalid += 1;
            }
        }
    }

    // checksum and rows land together or not at all
    let tx = conn.unchecked_transaction()?;
    let import_id = record_import(&tx, file_path, ImportKind::Transactions, rows.len(), &checksum)?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for (date, amount, row) in &rows {
        let date = date.to_string();
        let exists = tx
            .prepare_cached(
                "SELECT 1 FROM transactions WHERE account_id = ?1 AND date = ?2 AND amount = ?3 AND reference = ?4",
            )?
            .exists(rusqlite::params![account_id, date, amount, row.reference])?;
        if exists {
            skipped += 1;
            continue;
        }
        tx.execute(
            "INSERT INTO transactions (account_id, date, amount, sender, recipient, reference, import_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![account_id, date, amount, row.sender, row.recipient, row.reference, import_id],
        )?;
        imported += 1;
    }
    tx.commit()?;

    info!(file = %file_path.display(), imported, skipped, invalid, "imported transactions");
    Ok(ImportResult {
        imported,
        skipped,
        invalid,
        duplicate_file: false,
    })
}

// ---------------------------------------------------------------------------
// Receipts: date,vendor,invoice_number,amount[,issue_date]
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ReceiptRow {
    date: String,
    vendor: String,
    #[serde(default)]
    invoice_number: String,
    amount: String,
    #[serde(default)]
    issue_date: String,
}

pub fn import_receipts(conn: &Connection, file_path: &Path) -> Result<ImportResult> {
    let checksum = compute_checksum(file_path)?;
    if already_imported(conn, ImportKind::Receipts, &checksum)? {
        return Ok(ImportResult::duplicate());
    }

    let mut rows = Vec::new();
    let mut invalid = 0usize;
    for (line, result) in reader(file_path)?.deserialize::<ReceiptRow>().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(line = line + 2, error = %e, "unreadable receipt row");
                invalid += 1;
                continue;
            }
        };
        let issue_date = if row.issue_date.is_empty() {
            Some(None)
        } else {
            parse_date(&row.issue_date).map(Some)
        };
        match (parse_date(&row.date), parse_amount(&row.amount), issue_date) {
            (Some(date), Some(amount), Some(issue_date)) if !row.vendor.is_empty() => {
                rows.push((date, issue_date, amount.abs(), row))
            }
            _ => {
                warn!(
                    line = line + 2,
                    vendor = %row.vendor,
                    date = %row.date,
                    issue_date = %row.issue_date,
                    "invalid receipt row"
                );
                invalid += 1;
            }
        }
    }

    let tx = conn.unchecked_transaction()?;
    let import_id = record_import(&tx, file_path, ImportKind::Receipts, rows.len(), &checksum)?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for (date, issue_date, amount, row) in &rows {
        let date = date.to_string();
        let exists = tx
            .prepare_cached(
                "SELECT 1 FROM receipts WHERE vendor_name = ?1 AND invoice_number = ?2 AND amount = ?3 AND date = ?4",
            )?
            .exists(rusqlite::params![row.vendor, row.invoice_number, amount, date])?;
        if exists {
            skipped += 1;
            continue;
        }
        tx.execute(
            "INSERT INTO receipts (vendor_name, invoice_number, amount, date, issue_date, import_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                row.vendor,
                row.invoice_number,
                amount,
                date,
                issue_date.map(|d| d.to_string()),
                import_id,
            ],
        )?;
        imported += 1;
    }
    tx.commit()?;

    info!(file = %file_path.display(), imported, skipped, invalid, "imported receipts");
    Ok(ImportResult {
        imported,
        skipped,
        invalid,
        duplicate_file: false,
    })
}

pub fn import_file(conn: &Connection, kind: ImportKind, file_path: &Path, account: Option<&str>) -> Result<ImportResult> {
    match kind {
        ImportKind::Transactions => {
            let account = account.ok_or_else(|| DeskError::Other("--account is required for transactions".into()))?;
            import_transactions(conn, file_path, account)
        }
        ImportKind::Receipts => import_receipts(conn, file_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::reviewer::{add_account, list_unmatched_receipts};

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1234.56"), Some(1234.56));
        assert_eq!(parse_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("-79,99"), Some(-79.99));
        assert_eq!(parse_amount("€ 12.00"), Some(12.0));
        assert_eq!(parse_amount("(50.00)"), Some(-50.0));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 12);
        assert_eq!(parse_date("2025-03-12"), expected);
        assert_eq!(parse_date("12.03.2025"), expected);
        assert_eq!(parse_date("03/12/2025"), None);
    }

    #[test]
    fn test_import_transactions_and_reject_duplicate_file() {
        let (dir, conn) = test_db();
        add_account(&conn, "Checking", None, None).unwrap();
        let file = dir.path().join("bank.csv");
        std::fs::write(
            &file,
            "date,amount,sender,recipient,reference\n\
             2025-03-12,-79.99,Studio Nord,LinkedIn,LI-2025-03\n\
             12.03.2025,\"1.200,00\",Kunde AG,Studio Nord,RE-17\n\
             bad-date,1.00,,,\n",
        )
        .unwrap();

        let result = import_transactions(&conn, &file, "Checking").unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.invalid, 1);
        assert!(!result.duplicate_file);

        let again = import_transactions(&conn, &file, "Checking").unwrap();
        assert!(again.duplicate_file);

        let inflow: f64 = conn
            .query_row("SELECT amount FROM transactions WHERE sender = 'Kunde AG'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(inflow, 1200.0);
    }

    #[test]
    fn test_import_skips_duplicate_rows() {
        let (dir, conn) = test_db();
        add_account(&conn, "Checking", None, None).unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, "date,amount,recipient,reference\n2025-03-01,-5.00,Kiosk,\n").unwrap();
        std::fs::write(&b, "date,amount,recipient,reference\n2025-03-01,-5.00,Kiosk,\n2025-03-02,-6.00,Kiosk,\n").unwrap();
        import_transactions(&conn, &a, "Checking").unwrap();
        let result = import_transactions(&conn, &b, "Checking").unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_import_unknown_account() {
        let (dir, conn) = test_db();
        let file = dir.path().join("bank.csv");
        std::fs::write(&file, "date,amount\n2025-03-01,1\n").unwrap();
        assert!(matches!(
            import_transactions(&conn, &file, "Nope"),
            Err(DeskError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_import_receipts() {
        let (dir, conn) = test_db();
        let file = dir.path().join("receipts.csv");
        std::fs::write(
            &file,
            "date,vendor,invoice_number,amount,issue_date\n\
             2025-03-11,LinkedIn Ireland,LI-2025-03,79.99,2025-03-10\n\
             2025-03-11,Bauer Consulting,RE-118,\"7.140,00\",\n\
             2025-03-11,,X,1.00,\n",
        )
        .unwrap();
        let result = import_file(&conn, ImportKind::Receipts, &file, None).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.invalid, 1);

        let receipts = list_unmatched_receipts(&conn).unwrap();
        assert_eq!(receipts[0].issue_date, NaiveDate::from_ymd_opt(2025, 3, 10));
        assert_eq!(receipts[1].issue_date, None);
        assert_eq!(receipts[1].amount, 7140.0);
    }

    #[test]
    fn test_receipt_with_bad_issue_date_is_invalid() {
        let (dir, conn) = test_db();
        let file = dir.path().join("receipts.csv");
        std::fs::write(
            &file,
            "date,vendor,invoice_number,amount,issue_date\n\
             2025-03-11,Figma,F-1,12.00,2025-03-09\n\
             2025-03-11,Notion,N-1,8.00,sometime in March\n",
        )
        .unwrap();
        let result = import_receipts(&conn, &file).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.invalid, 1);
        let receipts = list_unmatched_receipts(&conn).unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].vendor_name, "Figma");
    }

    #[test]
    fn test_failed_import_rolls_back_and_can_be_retried() {
        let (dir, conn) = test_db();
        add_account(&conn, "Checking", None, None).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON transactions WHEN NEW.reference = 'boom' \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
        let file = dir.path().join("bank.csv");
        std::fs::write(
            &file,
            "date,amount,recipient,reference\n\
             2025-03-01,-5.00,Kiosk,ok\n\
             2025-03-02,-6.00,Kiosk,boom\n",
        )
        .unwrap();

        assert!(import_transactions(&conn, &file, "Checking").is_err());
        let count = |table: &str| -> i64 {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(count("transactions"), 0);
        assert_eq!(count("imports"), 0);

        conn.execute_batch("DROP TRIGGER reject_boom;").unwrap();
        let result = import_transactions(&conn, &file, "Checking").unwrap();
        assert!(!result.duplicate_file);
        assert_eq!(result.imported, 2);
    }
}
