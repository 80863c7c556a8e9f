use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

pub const DB_FILE: &str = "ledgerdesk.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    iban TEXT,
    institution TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL UNIQUE,
    icon TEXT NOT NULL DEFAULT '',
    path TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER DEFAULT 1
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    kind TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    amount REAL NOT NULL,
    sender TEXT NOT NULL DEFAULT '',
    recipient TEXT NOT NULL DEFAULT '',
    reference TEXT NOT NULL DEFAULT '',
    category TEXT,
    categorized_by TEXT,
    has_attachment INTEGER DEFAULT 0,
    is_private INTEGER DEFAULT 0,
    note TEXT,
    tax_rate REAL,
    needs_receipt INTEGER DEFAULT 0,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS splits (
    id INTEGER PRIMARY KEY,
    transaction_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    percentage INTEGER NOT NULL,
    amount REAL NOT NULL,
    FOREIGN KEY (transaction_id) REFERENCES transactions(id)
);

CREATE TABLE IF NOT EXISTS receipts (
    id INTEGER PRIMARY KEY,
    vendor_name TEXT NOT NULL,
    invoice_number TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL,
    date TEXT NOT NULL,
    issue_date TEXT,
    matched INTEGER DEFAULT 0,
    transaction_id INTEGER,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (transaction_id) REFERENCES transactions(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS rules (
    id INTEGER PRIMARY KEY,
    pattern TEXT NOT NULL,
    match_type TEXT DEFAULT 'contains',
    category TEXT NOT NULL,
    priority INTEGER DEFAULT 0,
    hit_count INTEGER DEFAULT 0,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);
";

// (id, label, icon, path)
const DEFAULT_CATEGORIES: &[(&str, &str, &str, &[&str])] = &[
    // Income
    ("revenue", "Revenue", "💶", &["Income", "Revenue"]),
    ("refunds", "Refunds", "↩️", &["Income", "Refunds"]),
    ("interest", "Interest Income", "🏦", &["Income", "Interest"]),
    // Operating expenses
    ("software", "Software & Subscriptions", "💻", &["Operating", "Software & Subscriptions"]),
    ("hosting", "Hosting & Infrastructure", "🖥️", &["Operating", "Hosting & Infrastructure"]),
    ("office", "Office Supplies", "📎", &["Operating", "Office Supplies"]),
    ("rent", "Rent", "🏢", &["Operating", "Rent"]),
    ("telecom", "Phone & Internet", "📞", &["Operating", "Phone & Internet"]),
    ("marketing", "Advertising & Marketing", "📣", &["Operating", "Advertising & Marketing"]),
    ("insurance", "Insurance", "🛡️", &["Operating", "Insurance"]),
    ("bank-fees", "Bank Fees", "💳", &["Operating", "Bank Fees"]),
    // People
    ("contractors", "Contractors", "🤝", &["People", "Contractors"]),
    ("payroll", "Payroll", "👥", &["People", "Payroll"]),
    ("training", "Education & Training", "🎓", &["People", "Education & Training"]),
    // Travel
    ("travel", "Travel", "✈️", &["Travel", "Transport & Lodging"]),
    ("meals", "Meals & Entertainment", "🍽️", &["Travel", "Meals & Entertainment"]),
    // Other
    ("equipment", "Equipment", "🔧", &["Assets", "Equipment"]),
    ("professional", "Legal & Professional", "⚖️", &["Operating", "Legal & Professional"]),
    ("taxes", "Taxes & Fees", "🧾", &["Taxes", "Taxes & Fees"]),
    ("transfer", "Transfer", "🔁", &["Other", "Transfer"]),
    ("private", "Private", "🔒", &["Private"]),
];

// (pattern, match_type, category, priority)
const DEFAULT_RULES: &[(&str, &str, &str, i64)] = &[
    ("linkedin", "contains", "Advertising & Marketing", 10),
    ("adobe", "contains", "Software & Subscriptions", 10),
    ("github", "contains", "Software & Subscriptions", 10),
    ("figma", "contains", "Software & Subscriptions", 10),
    ("google", "contains", "Software & Subscriptions", 5),
    ("aws", "contains", "Hosting & Infrastructure", 10),
    ("hetzner", "contains", "Hosting & Infrastructure", 10),
    ("telekom", "contains", "Phone & Internet", 10),
    ("vodafone", "contains", "Phone & Internet", 10),
    ("lufthansa", "contains", "Travel", 10),
    (r"^db\s", "regex", "Travel", 10),
    ("bahn", "contains", "Travel", 5),
    ("hotel", "contains", "Travel", 5),
    ("restaurant", "contains", "Meals & Entertainment", 5),
    ("miete", "contains", "Rent", 5),
    ("wework", "contains", "Rent", 5),
    ("gebühr", "contains", "Bank Fees", 5),
    ("kontoführung", "contains", "Bank Fees", 5),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for (id, label, icon, path) in DEFAULT_CATEGORIES {
            let path_json = serde_json::to_string(path)?;
            conn.execute(
                "INSERT INTO categories (id, label, icon, path) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, label, icon, path_json],
            )?;
        }
        debug!(count = DEFAULT_CATEGORIES.len(), "seeded categories");
    }

    let count: i64 = conn.query_row("SELECT count(*) FROM rules", [], |row| row.get(0))?;
    if count == 0 {
        for (pattern, match_type, category, priority) in DEFAULT_RULES {
            conn.execute(
                "INSERT INTO rules (pattern, match_type, category, priority) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![pattern, match_type, category, priority],
            )?;
        }
        debug!(count = DEFAULT_RULES.len(), "seeded suggestion rules");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["accounts", "categories", "transactions", "splits", "receipts", "rules", "imports"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM rules", [], |r| r.get(0)).unwrap();
        assert_eq!(count, DEFAULT_RULES.len() as i64);
    }

    #[test]
    fn test_private_category_seeded() {
        let (_dir, conn) = test_db();
        let path: String = conn
            .query_row("SELECT path FROM categories WHERE label = 'Private'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(path, r#"["Private"]"#);
    }

    #[test]
    fn test_rules_point_at_known_categories() {
        for (_, _, category, _) in DEFAULT_RULES {
            assert!(
                DEFAULT_CATEGORIES.iter().any(|(_, label, _, _)| label == category),
                "rule category not in taxonomy: {category}"
            );
        }
    }
}
