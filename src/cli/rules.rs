use comfy_table::{Cell, Table};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};

use crate::cli::open_db;
use crate::error::{DeskError, Result};
use crate::reviewer::{get_rules, get_taxonomy};
use crate::suggest::MATCH_TYPES;

pub(crate) fn add_rule(conn: &Connection, pattern: &str, category: &str, match_type: &str, priority: i64) -> Result<i64> {
    if pattern.trim().is_empty() {
        return Err(DeskError::InvalidRule("pattern is empty".into()));
    }
    if !MATCH_TYPES.contains(&match_type) {
        return Err(DeskError::InvalidRule(format!(
            "match type '{match_type}' (expected one of: {})",
            MATCH_TYPES.join(", ")
        )));
    }
    if match_type == "regex" {
        Regex::new(pattern).map_err(|e| DeskError::InvalidRule(e.to_string()))?;
    }
    if !get_taxonomy(conn)?.iter().any(|c| c.label == category) {
        return Err(DeskError::UnknownCategory(category.to_string()));
    }

    conn.execute(
        "INSERT INTO rules (pattern, match_type, category, priority) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![pattern, match_type, category, priority],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Deactivate a rule. Returns `(pattern, category)` of the removed rule.
pub(crate) fn delete_rule(conn: &Connection, id: i64) -> Result<(String, String)> {
    let row: Option<(String, String, i32)> = conn
        .query_row(
            "SELECT pattern, category, is_active FROM rules WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    match row {
        None => Err(DeskError::Other(format!("No rule with ID {id}"))),
        Some((_, _, 0)) => Err(DeskError::Other(format!("Rule {id} is already inactive"))),
        Some((pattern, category, _)) => {
            conn.execute("UPDATE rules SET is_active = 0 WHERE id = ?1", [id])?;
            Ok((pattern, category))
        }
    }
}

pub fn add(pattern: &str, category: &str, match_type: &str, priority: i64) -> Result<()> {
    let conn = open_db()?;
    add_rule(&conn, pattern, category, match_type, priority)?;
    println!("Added rule: '{pattern}' \u{2192} {category}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let rules = get_rules(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Pattern", "Type", "Category", "Priority"]);
    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.id),
            Cell::new(rule.pattern),
            Cell::new(rule.match_type),
            Cell::new(rule.category),
            Cell::new(rule.priority),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_db()?;
    let (pattern, category) = delete_rule(&conn, id)?;
    println!("Deleted rule {id}: '{pattern}' \u{2192} {category}");
    Ok(())
}
