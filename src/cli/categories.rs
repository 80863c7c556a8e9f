use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::reviewer::get_taxonomy;

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let categories = get_taxonomy(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["", "Category", "Path"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(&cat.icon),
            Cell::new(&cat.label),
            Cell::new(cat.breadcrumb()),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
