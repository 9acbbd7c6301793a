// File I/O for catalog reconciliation - workbook import/export, CSV

use std::path::Path;

use cotejo_match::table::RawTable;

pub mod csv;
pub mod xlsx;

/// Import any supported tabular file into a raw table, skipping `skip_rows`
/// leading banner rows so row 0 of the result is the header row.
pub fn import_table(path: &Path, skip_rows: usize) -> Result<RawTable, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "xlsx" | "xls" | "xlsb" | "ods" => xlsx::import_workbook(path, skip_rows),
        _ => csv::import_csv(path, skip_rows),
    }
}

/// `stem_YYYYMMDD_HHMMSS.ext`, the naming scheme for exported workbooks.
pub fn timestamped_name(stem: &str, ext: &str) -> String {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("{stem}_{ts}.{ext}")
}
