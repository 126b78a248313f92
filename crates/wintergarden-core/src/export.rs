//! CSV rendering of export tables.

use std::path::Path;

use crate::storage::ExportTable;

/// File name used for the numbered export.
pub const EXPORT_FILENAME: &str = "export.csv";

/// File name used for the raw table dump.
pub const BACKUP_FILENAME: &str = "backup.csv";

/// Render `table` as CSV with a header line and `\r\n` line endings.
pub fn to_csv(table: &ExportTable) -> String {
    let mut out = String::new();
    push_record(&mut out, &table.headers);
    for row in &table.rows {
        push_record(&mut out, row);
    }
    out
}

/// Write `table` as CSV to `path`.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_csv(table: &ExportTable, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, to_csv(table))
}

fn push_record(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
