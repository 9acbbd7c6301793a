// Excel workbook import and decorated export
//
// Import: first worksheet only, every cell stringified through cell_to_text
// before the engine sees it. Export: presentation snapshot of the updated
// catalogs with replaced costs, bold header and per-match-group fills.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook as XlsxWorkbook, Worksheet};

use cotejo_match::config::{MasterColumns, PriceColumns};
use cotejo_match::model::RunResult;
use cotejo_match::normalize::Normalizer;
use cotejo_match::table::RawTable;

/// Fill colors assigned to match groups, in rotation.
pub const GROUP_PALETTE: [u32; 8] = [
    0xC6EFCE, 0xFFF2CC, 0xFFCCE5, 0xCCE5FF, 0xE2EFDA, 0xF4CCCC, 0xD9E1F2, 0xEAD1DC,
];

/// Convert any workbook cell to the text the engine works with.
pub fn cell_to_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Data::Int(n) => format!("{n}"),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Import the first worksheet of a workbook, skipping `skip_rows` leading
/// banner rows.
pub fn import_workbook(path: &Path, skip_rows: usize) -> Result<RawTable, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("failed to open workbook: {e}"))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| "workbook contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| format!("failed to read sheet '{first}': {e}"))?;

    Ok(range
        .rows()
        .skip(skip_rows)
        .map(|row| row.iter().map(cell_to_text).collect())
        .collect())
}

/// Assign one palette color per match group. A pair whose either side is
/// already colored joins that earlier group instead of opening a new one.
pub fn build_color_map(result: &RunResult) -> HashMap<String, u32> {
    let mut map: HashMap<String, u32> = HashMap::new();
    let mut next = 0usize;
    for pair in &result.color_pairs {
        if !map.contains_key(&pair.price_key) && !map.contains_key(&pair.master_key) {
            let color = GROUP_PALETTE[next % GROUP_PALETTE.len()];
            map.insert(pair.price_key.clone(), color);
            map.insert(pair.master_key.clone(), color);
            next += 1;
        }
    }
    map
}

/// Write the master catalog with replaced costs and group fills.
pub fn export_master(
    path: &Path,
    table: &RawTable,
    columns: &MasterColumns,
    result: &RunResult,
    normalizer: &Normalizer,
    title: &str,
) -> Result<(), String> {
    let colors = build_color_map(result);
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name("Maestro")
        .map_err(|e| e.to_string())?;

    write_title_and_header(worksheet, table, title)?;

    for (i, row) in table.iter().skip(1).enumerate() {
        let out_row = (i + 2) as u32;
        let product = row.get(columns.product).map(String::as_str).unwrap_or("");
        let fill = colors
            .get(&normalizer.normalize(product))
            .map(|rgb| Format::new().set_background_color(Color::RGB(*rgb)));

        for (c, cell) in row.iter().enumerate() {
            let replaced;
            let value = if c == columns.cost {
                match result.cost_replacements.get(product) {
                    Some(new_cost) => {
                        replaced = new_cost.to_string();
                        &replaced
                    }
                    None => cell,
                }
            } else {
                cell
            };
            write_cell(worksheet, out_row, c as u16, value, fill.as_ref())?;
        }
    }

    workbook.save(path).map_err(|e| e.to_string())
}

/// Write the price list with the same group fills as the master export.
pub fn export_prices(
    path: &Path,
    table: &RawTable,
    columns: &PriceColumns,
    result: &RunResult,
    normalizer: &Normalizer,
    title: &str,
) -> Result<(), String> {
    let colors = build_color_map(result);
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name("Precios")
        .map_err(|e| e.to_string())?;

    write_title_and_header(worksheet, table, title)?;

    for (i, row) in table.iter().skip(1).enumerate() {
        let out_row = (i + 2) as u32;
        let description = row
            .get(columns.description)
            .map(String::as_str)
            .unwrap_or("");
        let fill = colors
            .get(&normalizer.normalize(description))
            .map(|rgb| Format::new().set_background_color(Color::RGB(*rgb)));

        for (c, cell) in row.iter().enumerate() {
            write_cell(worksheet, out_row, c as u16, cell, fill.as_ref())?;
        }
    }

    workbook.save(path).map_err(|e| e.to_string())
}

fn write_title_and_header(
    worksheet: &mut Worksheet,
    table: &RawTable,
    title: &str,
) -> Result<(), String> {
    let ncols = table.first().map(Vec::len).unwrap_or(0);
    let title_format = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);

    if ncols > 1 {
        worksheet
            .merge_range(0, 0, 0, (ncols - 1) as u16, title, &title_format)
            .map_err(|e| e.to_string())?;
    } else {
        worksheet
            .write_string_with_format(0, 0, title, &title_format)
            .map_err(|e| e.to_string())?;
    }

    let bold = Format::new().set_bold();
    if let Some(header) = table.first() {
        for (c, cell) in header.iter().enumerate() {
            worksheet
                .write_string_with_format(1, c as u16, cell, &bold)
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

/// Numeric cells are re-typed so spreadsheet formulas keep working on the
/// exported file; everything else stays text.
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &str,
    format: Option<&Format>,
) -> Result<(), String> {
    let numeric = value
        .trim()
        .replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite());

    let written = match (numeric, format) {
        (Some(n), Some(f)) => worksheet.write_number_with_format(row, col, n, f).map(|_| ()),
        (Some(n), None) => worksheet.write_number(row, col, n).map(|_| ()),
        (None, Some(f)) => worksheet
            .write_string_with_format(row, col, value, f)
            .map(|_| ()),
        (None, None) => worksheet.write_string(row, col, value).map(|_| ()),
    };
    written.map_err(|e| e.to_string())
}
