use crate::loader::TabularFormat;
use crate::record::columns;
use rust_xlsxwriter::{Format, Worksheet, Workbook, XlsxError};

/// Column widths of the XLSX template, in column order
const COLUMN_WIDTHS: [f64; 7] = [8.0, 40.0, 30.0, 12.0, 16.0, 14.0, 18.0];

/// A value in the sample sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleCell {
    Number(f64),
    Text(&'static str),
    Blank,
}

/// Example rows shipped with the template, in `columns::ALL` order
pub const SAMPLE_ROWS: [[SampleCell; 7]; 3] = {
    use SampleCell::*;
    [
        [
            Number(1.0),
            Text("https://example.com/logos/abc-technologies.png"),
            Text("ABC Technologies Ltd"),
            Number(250.0),
            Text("NSDL"),
            Text("Yes"),
            Number(100.0),
        ],
        [
            Number(2.0),
            Blank,
            Text("XYZ Pharma Pvt Ltd"),
            Number(1200.5),
            Text("NSDL & CDSL"),
            Blank,
            Number(50.0),
        ],
        [
            Number(3.0),
            Text("https://example.com/logos/pqr-finance.png"),
            Text("PQR Finance, Ltd"),
            Number(85.0),
            Text("CDSL"),
            Text("Lock-in till \"March\""),
            Number(500.0),
        ],
    ]
};

/// Produce the upload template in the requested format
pub fn template(format: TabularFormat) -> Result<Vec<u8>, XlsxError> {
    match format {
        TabularFormat::Csv => Ok(template_csv().into_bytes()),
        TabularFormat::Spreadsheet => template_xlsx(),
    }
}

/// Upload template as CSV
///
/// Values containing commas, quotes or newlines are quoted and escaped.
///
/// # Examples
/// ```
/// use shares_admin::downloader::template_csv;
///
/// let csv = template_csv();
/// assert!(csv.starts_with("S.No,Logo,Shares Name,Price,Depository,Applicable,Minimum Lot Size\n"));
/// assert_eq!(csv.lines().count(), 4);
/// ```
pub fn template_csv() -> String {
    let mut csv_content = columns::ALL.join(",");
    csv_content.push('\n');

    for row in SAMPLE_ROWS.iter() {
        for (c, cell) in row.iter().enumerate() {
            if c > 0 {
                csv_content.push(',');
            }

            match cell {
                SampleCell::Number(n) => csv_content.push_str(&n.to_string()),
                SampleCell::Text(value) => {
                    if value.contains(',') || value.contains('"') || value.contains('\n') {
                        let escaped = value.replace('"', "\"\"");
                        csv_content.push_str(&format!("\"{}\"", escaped));
                    } else {
                        csv_content.push_str(value);
                    }
                }
                SampleCell::Blank => {}
            }
        }
        csv_content.push('\n');
    }

    csv_content
}

/// Upload template as an XLSX workbook
///
/// The header row is bold and every column has a fixed width.
pub fn template_xlsx() -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Shares")?;

    let header_format = Format::new().set_bold();
    for (c, header) in columns::ALL.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, *header, &header_format)?;
        worksheet.set_column_width(c as u16, COLUMN_WIDTHS[c])?;
    }

    for (r, row) in SAMPLE_ROWS.iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            match cell {
                SampleCell::Number(n) => {
                    worksheet.write_number(excel_row, c as u16, *n)?;
                }
                SampleCell::Text(value) => {
                    worksheet.write_string(excel_row, c as u16, *value)?;
                }
                SampleCell::Blank => {}
            }
        }
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}
