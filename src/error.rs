use thiserror::Error;

/// The uploaded file could not be decoded in its declared format.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file is not valid UTF-8 text: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("spreadsheet contains no worksheets")]
    NoWorksheet,
}

/// Fatal failures of a bulk import. Field-level problems are not errors here,
/// they come back as a rejected batch.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported file type '{0}', upload a .csv, .xlsx or .xls file")]
    UnsupportedFormat(String),

    #[error("failed to parse file: {0}")]
    Parse(#[from] ParseError),

    #[error("file has {count} data rows but at most {limit} are allowed, split it and upload each part")]
    TooManyRows { count: usize, limit: usize },

    #[error("file contains no data rows")]
    EmptyFile,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode share collection: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("a share named '{0}' already exists")]
    Duplicate(String),
}
