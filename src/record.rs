use crate::loader::{CellValue, RawRow};
use serde::{Deserialize, Serialize};

/// Column headers of the bulk upload sheet, matched exactly
pub mod columns {
    pub const SERIAL_NUMBER: &str = "S.No";
    pub const LOGO: &str = "Logo";
    pub const NAME: &str = "Shares Name";
    pub const PRICE: &str = "Price";
    pub const DEPOSITORY: &str = "Depository";
    pub const APPLICABLE: &str = "Applicable";
    pub const MINIMUM_LOT_SIZE: &str = "Minimum Lot Size";

    /// Canonical column order, as written by the template
    pub const ALL: [&str; 7] = [
        SERIAL_NUMBER,
        LOGO,
        NAME,
        PRICE,
        DEPOSITORY,
        APPLICABLE,
        MINIMUM_LOT_SIZE,
    ];
}

/// Schema columns absent from a header row
pub fn missing_headers(headers: &[String]) -> Vec<&'static str> {
    columns::ALL
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header == column))
        .collect()
}

/// A data row with one cell per schema column
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShareRow {
    pub row_number: usize,
    pub serial_number: CellValue,
    pub logo: CellValue,
    pub name: CellValue,
    pub price: CellValue,
    pub depository: CellValue,
    pub applicable: CellValue,
    pub minimum_lot_size: CellValue,
}

impl From<RawRow> for ShareRow {
    fn from(mut raw: RawRow) -> Self {
        ShareRow {
            row_number: raw.row_number,
            serial_number: raw.take(columns::SERIAL_NUMBER),
            logo: raw.take(columns::LOGO),
            name: raw.take(columns::NAME),
            price: raw.take(columns::PRICE),
            depository: raw.take(columns::DEPOSITORY),
            applicable: raw.take(columns::APPLICABLE),
            minimum_lot_size: raw.take(columns::MINIMUM_LOT_SIZE),
        }
    }
}

/// A share that passed validation and is ready to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// Reference only, never persisted
    pub serial_number: Option<u32>,
    pub logo_url: Option<String>,
    pub name: String,
    pub price: f64,
    /// Normalized depository
    pub depository: String,
    pub minimum_lot_size: u32,
    pub applicable_note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::from_csv;

    #[test]
    fn share_row_picks_columns_by_header() {
        let table = from_csv(
            "Minimum Lot Size,Shares Name,Price,Depository\n10,ABC Ltd,99.5,CDSL\n",
        )
        .unwrap();
        let row = ShareRow::from(table.rows[0].clone());

        assert_eq!(row.row_number, 2);
        assert_eq!(row.name, CellValue::Text("ABC Ltd".into()));
        assert_eq!(row.minimum_lot_size, CellValue::Text("10".into()));
        assert_eq!(row.logo, CellValue::Empty);
        assert_eq!(row.serial_number, CellValue::Empty);
    }

    #[test]
    fn reports_missing_headers() {
        let headers = vec!["S.No".to_string(), "Shares Name".to_string(), "price".to_string()];
        assert_eq!(
            missing_headers(&headers),
            vec!["Logo", "Price", "Depository", "Applicable", "Minimum Lot Size"]
        );

        let all: Vec<String> = columns::ALL.iter().map(|c| c.to_string()).collect();
        assert!(missing_headers(&all).is_empty());
    }
}
