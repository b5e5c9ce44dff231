// Tabular extraction: file → grid of cells → header-keyed rows.
//
// Both input formats are first flattened into a grid indexed by physical row,
// so the template offsets in `SheetLayout` mean the same thing for delimited
// text and for the first worksheet of a workbook.
use crate::config::{QuoteMode, SheetLayout, DEALER_NAME_KEY, UNKNOWN_DEALER};
use crate::error::{LeadError, Result};
use crate::sanitize::sanitize_cell;
use crate::types::RawRow;
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use chrono::Timelike;
use log::{debug, info};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited,
    Workbook,
}

impl InputFormat {
    /// Pick the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<InputFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(InputFormat::Delimited),
            "xlsx" | "xls" => Ok(InputFormat::Workbook),
            _ => Err(LeadError::UnsupportedFormat(ext)),
        }
    }
}

pub fn extract_file(path: &Path, layout: &SheetLayout) -> Result<Vec<RawRow>> {
    match InputFormat::from_path(path)? {
        InputFormat::Delimited => {
            let bytes = std::fs::read(path)?;
            extract_delimited(&String::from_utf8_lossy(&bytes), layout)
        }
        InputFormat::Workbook => extract_workbook(path, layout),
    }
}

pub fn extract_delimited(text: &str, layout: &SheetLayout) -> Result<Vec<RawRow>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let grid = match layout.quoting {
        QuoteMode::Naive => split_naive(text, layout.delimiter),
        QuoteMode::Rfc4180 => split_quoted(text, layout.delimiter)?,
    };
    rows_from_grid(&grid, layout)
}

/// Read the first worksheet of an `.xlsx`/`.xls` workbook.
pub fn extract_workbook(path: &Path, layout: &SheetLayout) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LeadError::malformed("workbook contains no worksheets"))??;
    rows_from_grid(&grid_from_range(&range), layout)
}

/// Turn a physical-row grid into header-keyed rows.
///
/// The header row and dealer cell are addressed by `layout`; data starts at
/// `layout.data_start_row`. Rows whose mapped cells are all empty are dropped.
/// Columns with an empty header are ignored.
pub fn rows_from_grid(grid: &[Vec<String>], layout: &SheetLayout) -> Result<Vec<RawRow>> {
    let header_cells = grid.get(layout.header_row).ok_or_else(|| {
        LeadError::malformed(format!(
            "expected column headers on row {}, but the file has only {} rows",
            layout.header_row + 1,
            grid.len()
        ))
    })?;
    if grid.len() <= layout.data_start_row {
        return Err(LeadError::malformed(format!(
            "expected data from row {}, but the file has only {} rows",
            layout.data_start_row + 1,
            grid.len()
        )));
    }
    let headers: Vec<(usize, String)> = header_cells
        .iter()
        .enumerate()
        .map(|(idx, h)| (idx, strip_quotes(h).to_string()))
        .filter(|(_, h)| !h.is_empty())
        .collect();
    if headers.is_empty() {
        return Err(LeadError::malformed(format!(
            "header row {} is empty",
            layout.header_row + 1
        )));
    }
    debug!(
        "headers: {:?}",
        headers.iter().map(|(_, h)| h.as_str()).collect::<Vec<_>>()
    );

    let dealer = dealer_name(grid, layout);
    let mut rows = Vec::new();
    for values in grid.iter().skip(layout.data_start_row) {
        let mut row = RawRow::with_capacity(headers.len() + 1);
        for (idx, name) in &headers {
            let value = values.get(*idx).map(|v| sanitize_cell(v)).unwrap_or_default();
            row.insert(name.clone(), value);
        }
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        row.insert(DEALER_NAME_KEY.to_string(), dealer.clone());
        rows.push(row);
    }
    info!("extracted {} data rows for dealer '{}'", rows.len(), dealer);
    Ok(rows)
}

fn dealer_name(grid: &[Vec<String>], layout: &SheetLayout) -> String {
    let name = grid
        .get(layout.dealer_row)
        .and_then(|row| row.get(layout.dealer_col))
        .map(|cell| sanitize_cell(strip_quotes(cell)))
        .unwrap_or_default();
    if name.is_empty() {
        UNKNOWN_DEALER.to_string()
    } else {
        name
    }
}

/// Trim and remove one layer of enclosing double quotes.
fn strip_quotes(field: &str) -> &str {
    let t = field.trim();
    t.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(t)
}

// Split on every delimiter; quoted delimiters are not protected.
fn split_naive(text: &str, delim: char) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.split(delim).map(|f| strip_quotes(f).to_string()).collect())
        .collect()
}

// One grid row per physical line. The csv reader skips blank lines without
// counting them, so each line is parsed on its own and blank lines stay as
// empty rows. Quoted fields spanning lines are not supported.
fn split_quoted(text: &str, delim: char) -> Result<Vec<Vec<String>>> {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                return Ok(Vec::new());
            }
            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .delimiter(delim as u8)
                .from_reader(line.as_bytes());
            match rdr.records().next() {
                Some(record) => Ok(record?.iter().map(|f| f.trim().to_string()).collect()),
                None => Ok(Vec::new()),
            }
        })
        .collect()
}

fn grid_from_range(range: &Range<Data>) -> Vec<Vec<String>> {
    let Some((end_row, end_col)) = range.end() else {
        return Vec::new();
    };
    (0..=end_row)
        .map(|r| {
            (0..=end_col)
                .map(|c| range.get_value((r, c)).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 => {
                dt.format("%Y-%m-%d").to_string()
            }
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.as_f64().map(|f| f.to_string()).unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn preamble(dealer_line: &str) -> String {
        let mut s = String::from("Lead Activity Report\n");
        s.push_str(dealer_line);
        s.push('\n');
        for _ in 2..9 {
            s.push('\n');
        }
        s
    }

    fn sample(dealer_line: &str, header: &str, data: &[&str]) -> String {
        let mut s = preamble(dealer_line);
        s.push_str(header);
        s.push_str("\n\n");
        for line in data {
            s.push_str(line);
            s.push('\n');
        }
        s
    }

    #[test]
    fn reads_header_dealer_and_rows() {
        let text = sample(
            "Dealer Name:,\"Example Motors\"",
            "\"Lead Type\",Lead Date,Lead Source",
            &["Form,2025-01-02,Website", "Phone,2025-01-03,Walk-in"],
        );
        let rows = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Lead Type"], "Form");
        assert_eq!(rows[0]["Lead Source"], "Website");
        assert_eq!(rows[1]["Dealer Name"], "Example Motors");
    }

    #[test]
    fn drops_blank_rows_and_pads_short_rows() {
        let text = sample(
            "Dealer Name:,Acme",
            "Lead Type,Sale Date,Response Date",
            &[",,", "Form", "   ", "Form,2025-02-01,2025-01-30"],
        );
        let rows = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Sale Date"], "");
        assert_eq!(rows[0]["Response Date"], "");
        assert_eq!(rows[1]["Sale Date"], "2025-02-01");
    }

    #[test]
    fn blank_dealer_cell_defaults() {
        let text = sample("Dealer Name:,  ", "Lead Type", &["Form"]);
        let rows = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert_eq!(rows[0]["Dealer Name"], UNKNOWN_DEALER);

        let text = sample("Dealer Name:", "Lead Type", &["Form"]);
        let rows = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert_eq!(rows[0]["Dealer Name"], UNKNOWN_DEALER);
    }

    #[test]
    fn short_file_is_malformed() {
        let err = extract_delimited("a\nb\nc\n", &SheetLayout::default()).unwrap_err();
        assert!(matches!(err, LeadError::MalformedInput(_)));
    }

    #[test]
    fn empty_header_row_is_malformed() {
        let text = sample("Dealer Name:,Acme", ",,", &["Form"]);
        let err = extract_delimited(&text, &SheetLayout::default()).unwrap_err();
        assert!(matches!(err, LeadError::MalformedInput(_)));
    }

    #[test]
    fn header_without_data_rows_is_malformed() {
        let mut text = preamble("Dealer Name:,Acme");
        text.push_str("Lead Type,Lead Date\n\n");
        let err = extract_delimited(&text, &SheetLayout::default()).unwrap_err();
        assert!(matches!(err, LeadError::MalformedInput(_)));

        text.push_str(",\n");
        let rows = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn cells_are_sanitized() {
        let text = sample(
            "Dealer Name:,<b>Acme</b>",
            "Lead Type,Lead Source",
            &["Form,<script>x</script>Site onclick=go"],
        );
        let rows = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert_eq!(rows[0]["Dealer Name"], "Acme");
        assert_eq!(rows[0]["Lead Source"], "xSite go");
    }

    #[test]
    fn naive_mode_splits_quoted_separators() {
        let text = sample(
            "Dealer Name:,Acme",
            "Lead Type,Lead Source,Sale Date",
            &["Form,\"Smith, J\",2025-01-01"],
        );
        let rows = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert_eq!(rows[0]["Lead Source"], "\"Smith");
        assert_eq!(rows[0]["Sale Date"], "J\"");
    }

    #[test]
    fn rfc4180_mode_keeps_quoted_separators_and_offsets() {
        let text = sample(
            "Dealer Name:,\"Acme, Inc.\"",
            "Lead Type,Lead Source,Sale Date",
            &["Form,\"Smith, J\",2025-01-01"],
        );
        let layout = SheetLayout {
            quoting: QuoteMode::Rfc4180,
            ..SheetLayout::default()
        };
        let rows = extract_delimited(&text, &layout).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Dealer Name"], "Acme, Inc.");
        assert_eq!(rows[0]["Lead Source"], "Smith, J");
        assert_eq!(rows[0]["Sale Date"], "2025-01-01");
    }

    #[test]
    fn quoted_split_keeps_blank_lines_as_rows() {
        let grid = split_quoted("a\nb,c\n\n\n\n\n\n\n\nH1,\"H,2\"\n\nd,e\n", ',').unwrap();
        assert_eq!(grid.len(), 12);
        assert_eq!(grid[1], vec!["b", "c"]);
        assert!(grid[2].is_empty());
        assert_eq!(grid[9], vec!["H1", "H,2"]);
        assert!(grid[10].is_empty());
        assert_eq!(grid[11], vec!["d", "e"]);
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let text = format!(
            "\u{feff}{}",
            sample("Dealer Name:,Acme", "Lead Type,Lead Date", &["Form,2025-01-01"])
        )
        .replace('\n', "\r\n");
        let rows = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Lead Date"], "2025-01-01");
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = sample(
            "Dealer Name:,Acme",
            "Lead Type,Lead Date,Lead Source",
            &["Form,2025-01-02,Web", "Chat,2025-01-05,", "Form,,Referral"],
        );
        let a = extract_delimited(&text, &SheetLayout::default()).unwrap();
        let b = extract_delimited(&text, &SheetLayout::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.CSV")).unwrap(), InputFormat::Delimited);
        assert_eq!(InputFormat::from_path(Path::new("a.xls")).unwrap(), InputFormat::Workbook);
        assert!(matches!(
            InputFormat::from_path(Path::new("a.txt")),
            Err(LeadError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn grid_offsets_apply_to_workbook_shaped_input() {
        let mut grid: Vec<Vec<String>> = vec![Vec::new(); 11];
        grid[1] = vec!["Dealer".into(), "Grid Motors".into()];
        grid[9] = vec!["Lead Type".into(), "".into(), "Lead Date".into()];
        grid.push(vec!["Form".into(), "ignored".into(), "2025-04-01".into()]);
        let rows = rows_from_grid(&grid, &SheetLayout::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0]["Dealer Name"], "Grid Motors");
        assert_eq!(rows[0]["Lead Date"], "2025-04-01");
    }

    #[test]
    fn workbook_cells_render_as_text() {
        assert_eq!(cell_text(&Data::Float(42.0)), "42");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::String("Form".into())), "Form");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
