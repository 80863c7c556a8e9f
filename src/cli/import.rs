use std::path::PathBuf;

use crate::cli::open_db;
use crate::error::Result;
use crate::importer::{import_file, ImportKind};

pub fn run(kind: ImportKind, file: &str, account: Option<&str>) -> Result<()> {
    let file_path = PathBuf::from(file);
    let conn = open_db()?;

    let result = import_file(&conn, kind, &file_path, account)?;

    if result.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    }

    println!(
        "{} {} imported, {} skipped (duplicates)",
        result.imported,
        kind.key(),
        result.skipped
    );
    if result.invalid > 0 {
        println!("{} rows could not be read (set RUST_LOG=warn for details)", result.invalid);
    }
    Ok(())
}
