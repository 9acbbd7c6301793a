use crate::config::{MasterColumns, PriceColumns};
use crate::error::MatchError;
use crate::model::{MasterRecord, PriceRecord};
use crate::normalize::Normalizer;

/// A rectangular-ish table of already-stringified cells. Row 0 is the header
/// row; rows may be ragged, missing cells read as empty.
pub type RawRow = Vec<String>;
pub type RawTable = Vec<RawRow>;

/// Parse a CSV string into a raw table. Ragged rows are accepted; the engine
/// treats missing trailing cells as empty.
pub fn rows_from_csv(data: &str) -> Result<RawTable, MatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| MatchError::Csv(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Lenient price parsing: keep digits, dots and commas, commas become dots,
/// then take the leading decimal prefix. Anything unparsable is 0 rather
/// than an error; a bad cell must not abort a run.
pub fn parse_price(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }
    if !seen_digit {
        return 0.0;
    }
    cleaned[..end].trim_end_matches('.').parse().unwrap_or(0.0)
}

/// Project price records from the data rows of a cleaned table.
pub fn project_price_records(table: &RawTable, columns: &PriceColumns) -> Vec<PriceRecord> {
    table
        .iter()
        .skip(1)
        .map(|row| PriceRecord {
            code: cell(row, columns.code).trim().to_string(),
            description: cell(row, columns.description).trim().to_string(),
            price: parse_price(cell(row, columns.price)),
        })
        .collect()
}

/// Project master records from the data rows of a cleaned table.
pub fn project_master_records(table: &RawTable, columns: &MasterColumns) -> Vec<MasterRecord> {
    table
        .iter()
        .skip(1)
        .map(|row| MasterRecord {
            product: cell(row, columns.product).trim().to_string(),
            unit: cell(row, columns.unit).trim().to_string(),
            cost: parse_price(cell(row, columns.cost)),
        })
        .collect()
}

/// Remove decorative currency-symbol columns.
///
/// Pass 1 strips a leading currency marker from every cell. Pass 2 counts,
/// per column over the data rows, cells that are exactly a marker and cells
/// that are empty; a column whose combined ratio exceeds the cutoff is
/// dropped in pass 3. Spreadsheet exports put these columns anywhere, so the
/// position is detected, never assumed.
pub fn clean_currency_columns(
    table: &RawTable,
    normalizer: &Normalizer,
    cutoff: f64,
) -> RawTable {
    if table.is_empty() {
        return Vec::new();
    }

    // Pass 1: strip in-cell leading markers ("S/3.3" -> "3.3").
    let cleaned: RawTable = table
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| normalizer.strip_currency_prefix(c.trim()).trim().to_string())
                .collect()
        })
        .collect();

    // Pass 2: find columns that are nothing but markers and blanks.
    let num_cols = cleaned[0].len();
    let data_rows = cleaned.len().saturating_sub(1);
    let mut drop = vec![false; num_cols];

    if data_rows > 0 {
        for (col, flag) in drop.iter_mut().enumerate() {
            let mut symbols = 0usize;
            let mut empties = 0usize;
            for row in cleaned.iter().skip(1) {
                let val = cell(row, col).trim();
                if val.is_empty() {
                    empties += 1;
                } else if normalizer.is_currency_marker(val) {
                    symbols += 1;
                }
            }
            let ratio = (symbols + empties) as f64 / data_rows as f64;
            if ratio > cutoff {
                *flag = true;
            }
        }
    }

    // Pass 3: rebuild without the dropped columns.
    cleaned
        .into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .filter(|(i, _)| !drop.get(*i).copied().unwrap_or(false))
                .map(|(_, v)| v)
                .collect()
        })
        .collect()
}
