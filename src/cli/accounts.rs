use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::money;
use crate::reviewer::{add_account, list_accounts};

pub fn add(name: &str, iban: Option<&str>, institution: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    add_account(&conn, name, iban, institution)?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let accounts = list_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "IBAN", "Institution", "Transactions", "Balance"]);
    for account in accounts {
        let (count, balance): (i64, f64) = conn.query_row(
            "SELECT count(*), COALESCE(SUM(amount), 0) FROM transactions WHERE account_id = ?1",
            [account.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.name),
            Cell::new(account.iban.unwrap_or_default()),
            Cell::new(account.institution.unwrap_or_default()),
            Cell::new(count).set_alignment(CellAlignment::Right),
            Cell::new(money(balance)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
