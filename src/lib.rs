/*!
# Shares Admin

Bulk upload of unlisted shares for the admin dashboard, built in Rust.

## Overview

Admins keep the share listing up to date by uploading a CSV or Excel sheet
instead of typing every share into a form. This crate turns such a sheet into
a clean batch of share records, or into a precise list of what has to be fixed
before the sheet can be accepted.

## Pipeline

```text
file bytes ──▶ loader ──▶ ShareRow ──▶ validator ──▶ Accepted(records) ──▶ store
 (.csv/.xlsx)   (Table)    (typed)     (+depository)  └─▶ Rejected(errors)
```

- A batch is all-or-nothing: one invalid row rejects the whole file.
- At most 500 data rows per upload; larger files are refused before any row
  is validated.
- Every error names the row (header being row 1), the column, the raw value
  and what was expected, so the sheet can be corrected and uploaded again.

## Upload sheet

| Column             | Rule                                                      |
|--------------------|-----------------------------------------------------------|
| `S.No`             | optional, whole number greater than 0, not stored         |
| `Logo`             | optional, must be a URL                                   |
| `Shares Name`      | required                                                  |
| `Price`            | required, number greater than 0                           |
| `Depository`       | required, NSDL, CDSL, Physical or NSDL & CDSL             |
| `Applicable`       | optional free text                                        |
| `Minimum Lot Size` | required, whole number greater than 0                     |

## Modules

- **loader**: CSV and Excel parsing into header-keyed rows
- **record**: column names, typed rows and accepted records
- **depository**: depository normalization
- **validator**: per-row schema checks
- **importer**: the batch pipeline and row ceiling
- **downloader**: the upload template (CSV, XLSX)
- **store**: share persistence and batch writes
- **app**: HTTP admin API (feature `web`)
- **config**: server settings (feature `web`)

## REST API Endpoints

- `GET /api/shares` - Lists stored shares
- `GET /api/shares/template?format=csv|xlsx` - Downloads the upload template
- `POST /api/shares/import` - Uploads a sheet in multipart field `file`
*/

pub mod depository;
pub mod downloader;
pub mod error;
pub mod importer;
pub mod loader;
pub mod record;
pub mod store;
pub mod validator;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;

/// Re-export the pieces most callers need
pub use depository::{is_valid_depository, normalize_depository};
pub use error::{ImportError, ParseError, StoreError};
pub use importer::{ImportOutcome, Importer, MAX_IMPORT_ROWS, import};
pub use loader::{CellValue, TabularFormat};
pub use record::{ImportRecord, ShareRow};
pub use store::{FileStore, MemoryStore, PersistReport, ShareStore, StoredShare, persist_batch};
pub use validator::{RowValidator, SchemaValidator, ValidationError, validate_row};
