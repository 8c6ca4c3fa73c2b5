use crate::error::{ImportError, ParseError};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Source format of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabularFormat {
    /// Comma separated text (`.csv`)
    Csv,
    /// Excel workbook (`.xlsx` / `.xls`)
    Spreadsheet,
}

impl TabularFormat {
    /// Detect the format from a file name or path
    ///
    /// # Arguments
    /// * `path` - File name as uploaded, or a path on disk
    ///
    /// # Returns
    /// * `Result<TabularFormat, ImportError>` - The format, or `UnsupportedFormat`
    ///
    /// # Examples
    /// ```
    /// use shares_admin::loader::TabularFormat;
    ///
    /// assert_eq!(TabularFormat::from_path("shares.CSV").unwrap(), TabularFormat::Csv);
    /// assert_eq!(TabularFormat::from_path("shares.xls").unwrap(), TabularFormat::Spreadsheet);
    /// assert!(TabularFormat::from_path("shares.pdf").is_err());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(TabularFormat::Csv),
            Some("xlsx") | Some("xls") => Ok(TabularFormat::Spreadsheet),
            Some(ext) => Err(ImportError::UnsupportedFormat(ext.to_string())),
            None => Err(ImportError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A single cell as read from the file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// True for empty cells and cells holding only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Numeric view of the cell. Text is trimmed and parsed; non-finite values are rejected.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            CellValue::Empty => return None,
            CellValue::Number(n) => *n,
            CellValue::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    /// Trimmed text of the cell, `None` when blank
    pub fn as_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        Some(self.to_string().trim().to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            // Spreadsheets hand back whole numbers as floats
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One data row keyed by the header strings found in row 1
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based position in the source file, the header being row 1
    pub row_number: usize,
    cells: HashMap<String, CellValue>,
}

impl RawRow {
    /// Value under `header`, empty when the column is missing
    pub fn get(&self, header: &str) -> &CellValue {
        self.cells.get(header).unwrap_or(&EMPTY_CELL)
    }

    /// Move the value out of the row, empty when the column is missing
    pub fn take(&mut self, header: &str) -> CellValue {
        self.cells.remove(header).unwrap_or_default()
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_blank)
    }
}

/// Parsed file: the header row and every non-blank data row
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Table {
    fn from_records<I>(headers: Vec<String>, records: I) -> Self
    where
        I: IntoIterator<Item = (usize, Vec<CellValue>)>,
    {
        let mut rows = Vec::new();

        for (row_number, values) in records {
            let mut values = values.into_iter();
            let mut cells = HashMap::with_capacity(headers.len());
            for header in &headers {
                let value = values.next().unwrap_or_default();
                // First column wins when a header is repeated
                cells.entry(header.clone()).or_insert(value);
            }

            let row = RawRow { row_number, cells };
            if !row.is_blank() {
                rows.push(row);
            }
        }

        Table { headers, rows }
    }
}

/// Parse an uploaded file into rows
///
/// # Arguments
/// * `bytes` - Raw file content
/// * `format` - Declared format of the content
///
/// # Returns
/// * `Result<Table, ParseError>` - Header row and data rows, or the decoding failure
pub fn load_rows(bytes: &[u8], format: TabularFormat) -> Result<Table, ParseError> {
    match format {
        TabularFormat::Csv => from_csv(std::str::from_utf8(bytes)?),
        TabularFormat::Spreadsheet => from_excel(bytes),
    }
}

/// Load rows from CSV text
///
/// Quoted fields may contain commas, line breaks and doubled quotes. Missing
/// trailing cells come back as `CellValue::Empty`.
///
/// # Examples
/// ```
/// use shares_admin::loader::{from_csv, CellValue};
///
/// let table = from_csv("Shares Name,Price\n\"Acme, Inc.\",100\n").unwrap();
/// assert_eq!(table.rows[0].get("Shares Name"), &CellValue::Text("Acme, Inc.".into()));
/// assert_eq!(table.rows[0].row_number, 2);
/// ```
pub fn from_csv(text: &str) -> Result<Table, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = parse_csv_records(text)?.into_iter();

    let headers = match records.next() {
        Some(header) => header,
        None => return Ok(Table::default()),
    };

    let data = records.enumerate().map(|(i, record)| {
        let values: Vec<CellValue> = record
            .into_iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(field)
                }
            })
            .collect();
        (i + 2, values)
    });

    Ok(Table::from_records(headers, data))
}

/// Load rows from the first worksheet of an Excel workbook
pub fn from_excel(bytes: &[u8]) -> Result<Table, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::NoWorksheet)?;

    let range = workbook.worksheet_range(&sheet_name)?;
    if range.is_empty() {
        return Ok(Table::default());
    }

    // The range starts at the first used cell, not necessarily A1
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Table::default()),
    };

    let data = rows.enumerate().map(|(i, cells)| {
        let values: Vec<CellValue> = cells.iter().map(cell_value).collect();
        (first_row + i + 2, values)
    });

    Ok(Table::from_records(headers, data))
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

// Split CSV text into records of fields
fn parse_csv_records(text: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    // Set once the current field has opened a quoted segment
    let mut field_quoted = false;
    let mut line = 1;
    let mut quote_line = 0;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Double quote inside quoted field - add a single quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            // Only a quote that opens the field starts a quoted segment
            '"' if current_field.is_empty() && !field_quoted => {
                in_quotes = true;
                field_quoted = true;
                quote_line = line;
            }
            ',' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
                field_quoted = false;
            }
            '\r' | '\n' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut current_field));
                field_quoted = false;
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            _ => {
                if c == '\n' {
                    line += 1;
                }
                current_field.push(c);
            }
        }
    }

    if in_quotes {
        return Err(ParseError::UnterminatedQuote { line: quote_line });
    }

    // Last record without a trailing newline
    if !current_field.is_empty() || !record.is_empty() {
        record.push(current_field);
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_field_keeps_delimiter() {
        let table = from_csv(
            "Shares Name,Price,Depository,Applicable,Minimum Lot Size\n\"Acme, Inc.\",100,NSDL,NSDL,1\n",
        )
        .unwrap();

        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row.get("Shares Name"), &CellValue::Text("Acme, Inc.".to_string()));
        assert_eq!(row.get("Price"), &CellValue::Text("100".to_string()));
        assert_eq!(row.get("Minimum Lot Size"), &CellValue::Text("1".to_string()));
    }

    #[test]
    fn doubled_quotes_and_line_breaks_inside_quotes() {
        let table = from_csv("Name,Note\n\"Say \"\"hi\"\"\",\"two\nlines\"\r\nNext,x\r\n").unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("Name"), &CellValue::Text("Say \"hi\"".to_string()));
        assert_eq!(table.rows[0].get("Note"), &CellValue::Text("two\nlines".to_string()));
        assert_eq!(table.rows[1].get("Name"), &CellValue::Text("Next".to_string()));
        assert_eq!(table.rows[1].row_number, 3);
    }

    #[test]
    fn missing_cells_default_to_empty() {
        let table = from_csv("A,B,C\n1\n").unwrap();
        let row = &table.rows[0];

        assert_eq!(row.get("A"), &CellValue::Text("1".to_string()));
        assert_eq!(row.get("B"), &CellValue::Empty);
        assert_eq!(row.get("C"), &CellValue::Empty);
        assert_eq!(row.get("not a column"), &CellValue::Empty);
    }

    #[test]
    fn blank_lines_are_skipped_without_renumbering() {
        let table = from_csv("A,B\n1,2\n\n,\n3,4\n").unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].row_number, 2);
        assert_eq!(table.rows[1].row_number, 5);
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let table = from_csv("\u{feff}S.No,Shares Name\n").unwrap();

        assert_eq!(table.headers, vec!["S.No".to_string(), "Shares Name".to_string()]);
        assert!(table.rows.is_empty());
        assert!(from_csv("").unwrap().headers.is_empty());
    }

    #[test]
    fn quotes_inside_unquoted_fields_are_literal() {
        let table = from_csv("Shares Name,Applicable\nABC \"Pref\" Ltd,x\nLot 5\" cert,y\n").unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0].get("Shares Name"),
            &CellValue::Text("ABC \"Pref\" Ltd".to_string())
        );
        assert_eq!(table.rows[0].get("Applicable"), &CellValue::Text("x".to_string()));
        assert_eq!(table.rows[1].get("Shares Name"), &CellValue::Text("Lot 5\" cert".to_string()));
        assert_eq!(table.rows[1].get("Applicable"), &CellValue::Text("y".to_string()));
    }

    #[test]
    fn text_after_closing_quote_is_kept() {
        let table = from_csv("A,B\n\"\",\"quoted\" tail\n").unwrap();

        assert_eq!(table.rows[0].get("A"), &CellValue::Empty);
        assert_eq!(table.rows[0].get("B"), &CellValue::Text("quoted tail".to_string()));
    }

    #[test]
    fn unterminated_quote_is_a_parse_error() {
        let err = from_csv("A,B\n1,\"open\n2,3\n").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedQuote { line: 2 }));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = load_rows(&[0x41, 0xff, 0xfe], TabularFormat::Csv).unwrap_err();
        assert!(matches!(err, ParseError::Encoding(_)));
    }

    #[test]
    fn corrupt_workbook_is_a_parse_error() {
        let result = load_rows(b"definitely not a workbook", TabularFormat::Spreadsheet);
        assert!(result.is_err());
    }

    #[test]
    fn numbers_display_without_trailing_fraction() {
        assert_eq!(CellValue::Number(100.0).to_string(), "100");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Text(" 42 ".into()).as_number(), Some(42.0));
        assert_eq!(CellValue::Text("NaN".into()).as_number(), None);
        assert_eq!(CellValue::Empty.as_text(), None);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(TabularFormat::from_path("a.csv").unwrap(), TabularFormat::Csv);
        assert_eq!(TabularFormat::from_path("dir/a.XLSX").unwrap(), TabularFormat::Spreadsheet);
        assert!(matches!(
            TabularFormat::from_path("a.txt"),
            Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"
        ));
        assert!(TabularFormat::from_path("noext").is_err());
    }
}
