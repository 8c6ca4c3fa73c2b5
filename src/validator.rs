use crate::depository::{ACCEPTED_DEPOSITORIES, is_valid_depository, normalize_depository};
use crate::loader::CellValue;
use crate::record::{ImportRecord, ShareRow, columns};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Schemes a logo may be served from
const LOGO_SCHEMES: [&str; 4] = ["http", "https", "ftp", "data"];

/// One field of one row that failed a schema check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Row in the source file, header being row 1
    pub row_index: usize,
    /// Column header of the failing field
    pub field_name: String,
    pub raw_value: String,
    pub message: String,
}

impl ValidationError {
    fn new(row_index: usize, field_name: &str, raw: &CellValue, message: impl Into<String>) -> Self {
        ValidationError {
            row_index,
            field_name: field_name.to_string(),
            raw_value: raw.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}: {}", self.row_index, self.field_name, self.message)?;
        if !self.raw_value.is_empty() {
            write!(f, " (value: '{}')", self.raw_value)?;
        }
        Ok(())
    }
}

/// Checks a typed row and turns it into a record.
///
/// The importer takes any implementation, which lets callers observe or wrap
/// validation.
pub trait RowValidator {
    fn check(&self, row: &ShareRow) -> Result<ImportRecord, Vec<ValidationError>>;
}

/// The bulk upload schema
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl RowValidator for SchemaValidator {
    fn check(&self, row: &ShareRow) -> Result<ImportRecord, Vec<ValidationError>> {
        check_row(row, row.row_number)
    }
}

/// Every schema violation in a row, in column order. Empty means the row is acceptable.
pub fn validate_row(row: &ShareRow, row_index: usize) -> Vec<ValidationError> {
    check_row(row, row_index).err().unwrap_or_default()
}

/// Validate a row and build its record
///
/// All checks run, so one call reports every problem in the row.
///
/// # Arguments
/// * `row` - Typed row from the parser
/// * `row_index` - 1-based row in the source file (first data row is 2)
///
/// # Returns
/// * `Result<ImportRecord, Vec<ValidationError>>` - The record, or every error found
pub fn check_row(row: &ShareRow, row_index: usize) -> Result<ImportRecord, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let serial_number = check_serial_number(&row.serial_number, row_index, &mut errors);
    let logo_url = check_logo(&row.logo, row_index, &mut errors);
    let name = check_name(&row.name, row_index, &mut errors);
    let price = check_price(&row.price, row_index, &mut errors);
    let depository = check_depository(&row.depository, row_index, &mut errors);
    let minimum_lot_size = check_lot_size(&row.minimum_lot_size, row_index, &mut errors);

    match (name, price, depository, minimum_lot_size) {
        (Some(name), Some(price), Some(depository), Some(minimum_lot_size)) if errors.is_empty() => {
            Ok(ImportRecord {
                serial_number,
                logo_url,
                name,
                price,
                depository,
                minimum_lot_size,
                applicable_note: row.applicable.as_text(),
            })
        }
        _ => Err(errors),
    }
}

fn check_serial_number(
    cell: &CellValue,
    row_index: usize,
    errors: &mut Vec<ValidationError>,
) -> Option<u32> {
    if cell.is_blank() {
        return None;
    }
    let field = columns::SERIAL_NUMBER;

    match cell.as_number() {
        None => {
            errors.push(ValidationError::new(row_index, field, cell, "S.No must be a number"));
            None
        }
        Some(n) if n <= 0.0 => {
            errors.push(ValidationError::new(row_index, field, cell, "S.No must be greater than 0"));
            None
        }
        Some(n) if n.fract() != 0.0 => {
            errors.push(ValidationError::new(row_index, field, cell, "S.No must be a whole number"));
            None
        }
        Some(n) if n > u32::MAX as f64 => {
            errors.push(ValidationError::new(
                row_index,
                field,
                cell,
                format!("S.No must not be greater than {}", u32::MAX),
            ));
            None
        }
        Some(n) => Some(n as u32),
    }
}

fn check_logo(cell: &CellValue, row_index: usize, errors: &mut Vec<ValidationError>) -> Option<String> {
    let url = cell.as_text()?;
    let well_formed = match Url::parse(&url) {
        Ok(parsed) if parsed.scheme() == "data" => true,
        Ok(parsed) => LOGO_SCHEMES.contains(&parsed.scheme()) && parsed.host().is_some(),
        Err(_) => false,
    };

    if well_formed {
        Some(url)
    } else {
        errors.push(ValidationError::new(
            row_index,
            columns::LOGO,
            cell,
            "Logo must be a valid URL such as https://example.com/logo.png",
        ));
        None
    }
}

fn check_name(cell: &CellValue, row_index: usize, errors: &mut Vec<ValidationError>) -> Option<String> {
    let name = cell.as_text();
    if name.is_none() {
        errors.push(ValidationError::new(row_index, columns::NAME, cell, "Shares Name is required"));
    }
    name
}

fn check_price(cell: &CellValue, row_index: usize, errors: &mut Vec<ValidationError>) -> Option<f64> {
    let field = columns::PRICE;
    if cell.is_blank() {
        errors.push(ValidationError::new(row_index, field, cell, "Price is required"));
        return None;
    }

    match cell.as_number() {
        None => {
            errors.push(ValidationError::new(row_index, field, cell, "Price must be a number"));
            None
        }
        Some(price) if price <= 0.0 => {
            errors.push(ValidationError::new(row_index, field, cell, "Price must be greater than 0"));
            None
        }
        Some(price) => Some(price),
    }
}

fn check_depository(
    cell: &CellValue,
    row_index: usize,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    let field = columns::DEPOSITORY;
    let Some(raw) = cell.as_text() else {
        errors.push(ValidationError::new(row_index, field, cell, "Depository is required"));
        return None;
    };

    let normalized = normalize_depository(&raw);
    if is_valid_depository(&normalized) {
        Some(normalized)
    } else {
        errors.push(ValidationError::new(
            row_index,
            field,
            cell,
            format!(
                "Depository must be one of {} (normalized to '{}')",
                ACCEPTED_DEPOSITORIES.join(", "),
                normalized
            ),
        ));
        None
    }
}

fn check_lot_size(cell: &CellValue, row_index: usize, errors: &mut Vec<ValidationError>) -> Option<u32> {
    let field = columns::MINIMUM_LOT_SIZE;
    if cell.is_blank() {
        errors.push(ValidationError::new(row_index, field, cell, "Minimum Lot Size is required"));
        return None;
    }

    match cell.as_number() {
        None => {
            errors.push(ValidationError::new(
                row_index,
                field,
                cell,
                "Minimum Lot Size must be a number",
            ));
            None
        }
        Some(n) if n <= 0.0 || n.fract() != 0.0 => {
            errors.push(ValidationError::new(
                row_index,
                field,
                cell,
                "Minimum Lot Size must be a whole number greater than 0",
            ));
            None
        }
        Some(n) if n > u32::MAX as f64 => {
            errors.push(ValidationError::new(
                row_index,
                field,
                cell,
                format!("Minimum Lot Size must not be greater than {}", u32::MAX),
            ));
            None
        }
        Some(n) => Some(n as u32),
    }
}
