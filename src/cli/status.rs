use colored::Colorize;

use crate::cli::{open_db, parse_month_opt};
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::{format_bytes, money, rate};
use crate::reviewer::month_overview;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Tax rate:   {}", rate(settings.default_tax_rate));

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let count = |sql: &str| conn.query_row(sql, [], |r| r.get::<_, i64>(0));

        println!();
        println!("Accounts:       {}", count("SELECT count(*) FROM accounts")?);
        println!("Transactions:   {}", count("SELECT count(*) FROM transactions")?);
        println!("Uncategorized:  {}", count("SELECT count(*) FROM transactions WHERE category IS NULL")?);
        println!("Receipts:       {}", count("SELECT count(*) FROM receipts")?);
        println!("Unmatched:      {}", count("SELECT count(*) FROM receipts WHERE matched = 0")?);
        println!("Rules:          {}", count("SELECT count(*) FROM rules WHERE is_active = 1")?);
    } else {
        println!();
        println!("Database not found. Run `ledgerdesk init` to set up.");
    }

    Ok(())
}

pub fn overview(month: Option<&str>) -> Result<()> {
    let month = parse_month_opt(month)?;
    let conn = open_db()?;
    let o = month_overview(&conn, month)?;

    println!("{}", format!("Overview {month}").bold());
    if o.total == 0 {
        println!("No transactions in {month}.");
        return Ok(());
    }
    let done = o.total - o.uncategorized;
    println!("Categorized:    {done} of {} ({}%)", o.total, done * 100 / o.total);
    println!("  by AI:        {}", o.by_ai);
    println!("  manually:     {}", o.manual);
    println!("With receipt:   {}", o.with_attachment);
    println!("Need receipt:   {}", o.follow_up);
    println!("Inflow:         {}", money(o.inflow).green());
    println!("Outflow:        {}", money(o.outflow).red());
    if o.uncategorized > 0 {
        println!();
        println!("{} open, run `ledgerdesk review --month {month}`", o.uncategorized.to_string().yellow());
    }
    Ok(())
}
