use crate::error::ImportError;
use crate::loader::{self, Table, TabularFormat};
use crate::record::{ImportRecord, ShareRow, missing_headers};
use crate::validator::{RowValidator, SchemaValidator, ValidationError};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::Path;

/// Hard ceiling on data rows per upload
pub const MAX_IMPORT_ROWS: usize = 500;

/// Result of a bulk import: the whole batch, or every reason it was refused
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImportOutcome {
    #[serde(rename = "accepted")]
    Accepted(Vec<ImportRecord>),
    #[serde(rename = "errors")]
    Rejected(Vec<ValidationError>),
}

impl ImportOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ImportOutcome::Accepted(_))
    }
}

/// Parse, validate and split an upload into accepted records or a rejection.
///
/// A batch is all-or-nothing: one bad row rejects the file and no records
/// are handed back.
#[derive(Debug, Clone, Default)]
pub struct Importer<V = SchemaValidator> {
    validator: V,
}

impl Importer {
    pub fn new() -> Self {
        Importer {
            validator: SchemaValidator,
        }
    }
}

impl<V: RowValidator> Importer<V> {
    pub fn with_validator(validator: V) -> Self {
        Importer { validator }
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Import file content of a known format
    ///
    /// # Arguments
    /// * `bytes` - Raw file content
    /// * `format` - Declared format of the content
    ///
    /// # Returns
    /// * `Result<ImportOutcome, ImportError>` - Accepted or rejected batch, or a fatal error
    pub fn import(&self, bytes: &[u8], format: TabularFormat) -> Result<ImportOutcome, ImportError> {
        debug!("parsing {:?} upload of {} bytes", format, bytes.len());
        let table = loader::load_rows(bytes, format)?;
        self.import_table(table)
    }

    /// Import a file from disk, picking the format from its extension
    pub fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportOutcome, ImportError> {
        let path = path.as_ref();
        let format = TabularFormat::from_path(path)?;
        let bytes = std::fs::read(path)?;
        self.import(&bytes, format)
    }

    /// Validate an already parsed table
    pub fn import_table(&self, table: Table) -> Result<ImportOutcome, ImportError> {
        let missing = missing_headers(&table.headers);
        if !missing.is_empty() {
            warn!("upload is missing columns: {}", missing.join(", "));
        }

        let count = table.rows.len();
        if count > MAX_IMPORT_ROWS {
            return Err(ImportError::TooManyRows {
                count,
                limit: MAX_IMPORT_ROWS,
            });
        }
        if count == 0 {
            return Err(ImportError::EmptyFile);
        }

        debug!("validating {} rows", count);
        let mut records = Vec::with_capacity(count);
        let mut errors = Vec::new();

        for raw in table.rows {
            let row = ShareRow::from(raw);
            match self.validator.check(&row) {
                Ok(record) => records.push(record),
                Err(row_errors) => errors.extend(row_errors),
            }
        }

        if errors.is_empty() {
            info!("accepted batch of {} shares", records.len());
            Ok(ImportOutcome::Accepted(records))
        } else {
            info!("rejected batch of {} rows with {} errors", count, errors.len());
            Ok(ImportOutcome::Rejected(errors))
        }
    }
}

/// Import with the standard schema
///
/// # Examples
/// ```
/// use shares_admin::importer::{import, ImportOutcome};
/// use shares_admin::loader::TabularFormat;
///
/// let csv = "S.No,Logo,Shares Name,Price,Depository,Applicable,Minimum Lot Size\n\
///            1,,ABC Ltd,100,NSDL,Yes,1\n";
/// match import(csv.as_bytes(), TabularFormat::Csv).unwrap() {
///     ImportOutcome::Accepted(records) => assert_eq!(records[0].name, "ABC Ltd"),
///     ImportOutcome::Rejected(errors) => panic!("unexpected errors: {:?}", errors),
/// }
/// ```
pub fn import(bytes: &[u8], format: TabularFormat) -> Result<ImportOutcome, ImportError> {
    Importer::new().import(bytes, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const HEADER: &str = "S.No,Logo,Shares Name,Price,Depository,Applicable,Minimum Lot Size\n";

    struct CountingValidator {
        calls: Cell<usize>,
    }

    impl RowValidator for CountingValidator {
        fn check(&self, row: &ShareRow) -> Result<ImportRecord, Vec<ValidationError>> {
            self.calls.set(self.calls.get() + 1);
            SchemaValidator.check(row)
        }
    }

    fn csv_with_rows(count: usize) -> String {
        let mut csv = HEADER.to_string();
        for i in 1..=count {
            csv.push_str(&format!("{i},,Share {i},{},NSDL,,10\n", 100 + i));
        }
        csv
    }

    #[test]
    fn too_many_rows_fails_before_validation() {
        let importer = Importer::with_validator(CountingValidator { calls: Cell::new(0) });
        let err = importer
            .import(csv_with_rows(501).as_bytes(), TabularFormat::Csv)
            .unwrap_err();

        assert!(matches!(err, ImportError::TooManyRows { count: 501, limit: 500 }));
        assert_eq!(importer.validator().calls.get(), 0);
    }

    #[test]
    fn exactly_the_ceiling_is_allowed() {
        let importer = Importer::with_validator(CountingValidator { calls: Cell::new(0) });
        let outcome = importer
            .import(csv_with_rows(MAX_IMPORT_ROWS).as_bytes(), TabularFormat::Csv)
            .unwrap();

        assert!(outcome.is_accepted());
        assert_eq!(importer.validator().calls.get(), MAX_IMPORT_ROWS);
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = import(HEADER.as_bytes(), TabularFormat::Csv).unwrap_err();
        assert!(matches!(err, ImportError::EmptyFile));

        let err = import(b"", TabularFormat::Csv).unwrap_err();
        assert!(matches!(err, ImportError::EmptyFile));
    }

    #[test]
    fn one_bad_row_rejects_the_batch() {
        let mut csv = csv_with_rows(10);
        csv.push_str("11,,,0,NSDL,,10\n");

        match import(csv.as_bytes(), TabularFormat::Csv).unwrap() {
            ImportOutcome::Rejected(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().all(|e| e.row_index == 12));
                assert_eq!(errors[0].field_name, "Shares Name");
                assert_eq!(errors[1].field_name, "Price");
            }
            ImportOutcome::Accepted(_) => panic!("batch with an invalid row was accepted"),
        }
    }

    #[test]
    fn parse_errors_abort_the_import() {
        let csv = format!("{HEADER}1,,\"Broken,100,NSDL,,1\n");
        let err = import(csv.as_bytes(), TabularFormat::Csv).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }

    #[test]
    fn outcome_serializes_to_report_shape() {
        let outcome = import(csv_with_rows(1).as_bytes(), TabularFormat::Csv).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["accepted"][0]["name"], "Share 1");
        assert_eq!(json["accepted"][0]["minimumLotSize"], 10);

        let rejected = import(format!("{HEADER}1,,X,0,NSDL,,1\n").as_bytes(), TabularFormat::Csv).unwrap();
        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["errors"][0]["fieldName"], "Price");
        assert_eq!(json["errors"][0]["rowIndex"], 2);
    }
}
