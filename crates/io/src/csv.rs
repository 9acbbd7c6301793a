// CSV import to raw tables

use std::path::Path;

use cotejo_match::table::RawTable;

/// Import a CSV/TSV file, skipping `skip_rows` leading rows.
pub fn import_csv(path: &Path, skip_rows: usize) -> Result<RawTable, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    rows_from_str(&content, delimiter, skip_rows)
}

pub fn rows_from_str(content: &str, delimiter: u8, skip_rows: usize) -> Result<RawTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: RawTable = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows.into_iter().skip(skip_rows).collect())
}

/// Read a file and convert to UTF-8 if needed (Windows-1252 exports are
/// common for the price lists this tool sees).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

/// Detect the most likely field delimiter by checking consistency across the
/// first few lines. The candidate producing the most consistent multi-field
/// split wins; more fields breaks ties.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn sniff_comma() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
    }

    #[test]
    fn sniff_semicolon() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n1;2;3\n"), b';');
    }

    #[test]
    fn sniff_tab() {
        assert_eq!(sniff_delimiter("a\tb\tc\n1\t2\t3\n"), b'\t');
    }

    #[test]
    fn sniff_defaults_to_comma_on_single_column() {
        assert_eq!(sniff_delimiter("justoneword\nanother\n"), b',');
    }

    #[test]
    fn rows_skip_banner() {
        let rows = rows_from_str("BANNER,,\nA,B,C\n1,2,3\n", b',', 1).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["A", "B", "C"]);
    }

    #[test]
    fn import_decodes_windows_1252() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Azúcar" in Windows-1252: ú = 0xFA
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"PRODUCTO,PRECIO\nAz\xFAcar,4.20\n").unwrap();
        drop(f);

        let rows = import_csv(&path, 0).unwrap();
        assert_eq!(rows[1][0], "Azúcar");
    }

    #[test]
    fn import_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        std::fs::write(&path, "\u{feff}A,B\n1,2\n").unwrap();
        let rows = import_csv(&path, 0).unwrap();
        assert_eq!(rows[0][0], "A");
    }
}
