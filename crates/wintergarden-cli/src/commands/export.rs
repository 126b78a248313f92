use std::path::PathBuf;

use wintergarden_core::export::{to_csv, write_csv};
use wintergarden_core::{Config, ExportTable};

pub fn run_export(config: &Config, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let table = super::open_garden(config)?.full_export()?;
    emit(&table, output)
}

pub fn run_backup(config: &Config, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let table = super::open_garden(config)?.backup()?;
    emit(&table, output)
}

fn emit(table: &ExportTable, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            write_csv(table, &path)?;
            eprintln!("wrote {} rows to {}", table.rows.len(), path.display());
        }
        None => print!("{}", to_csv(table)),
    }
    Ok(())
}
