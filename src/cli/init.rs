use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path};

pub fn run(data_dir: Option<String>, name: Option<String>, tax_rate: Option<f64>) -> Result<()> {
    let mut settings = load_settings();
    let existing = settings_file_exists();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(name) = name {
        settings.user_name = name;
    }
    if let Some(rate) = tax_rate {
        settings.default_tax_rate = rate;
    }

    save_settings(&settings)?;
    std::fs::create_dir_all(&settings.data_dir)?;

    let db_path = settings.db_path();
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;

    if existing {
        println!("Settings updated.");
    } else {
        println!("ledgerdesk initialized.");
    }
    println!("  Data dir:  {}", settings.data_dir);
    println!("  Database:  {}", db_path.display());
    println!("  Tax rate:  {}", crate::fmt::rate(settings.default_tax_rate));
    println!();
    println!("Next: `ledgerdesk accounts add <name>` or `ledgerdesk demo`.");
    Ok(())
}
