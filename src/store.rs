use crate::error::StoreError;
use crate::record::ImportRecord;
use bincode::{deserialize_from, serialize_into};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A share document as persisted. The upload's serial number is not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredShare {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub depository: String,
    pub minimum_lot_size: u32,
    pub logo_url: Option<String>,
    pub applicable_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredShare {
    pub fn from_record(record: &ImportRecord) -> Self {
        StoredShare {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            price: record.price,
            depository: record.depository.clone(),
            minimum_lot_size: record.minimum_lot_size,
            logo_url: record.logo_url.clone(),
            applicable_note: record.applicable_note.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Write side of the share collection, one document at a time
pub trait ShareStore {
    fn insert(&mut self, record: &ImportRecord) -> Result<StoredShare, StoreError>;

    fn list(&self) -> Vec<StoredShare>;
}

fn ensure_unique(shares: &[StoredShare], name: &str) -> Result<(), StoreError> {
    let folded = name.to_lowercase();
    if shares.iter().any(|share| share.name.to_lowercase() == folded) {
        return Err(StoreError::Duplicate(name.to_string()));
    }
    Ok(())
}

/// In-process store, used for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shares: Vec<StoredShare>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShareStore for MemoryStore {
    fn insert(&mut self, record: &ImportRecord) -> Result<StoredShare, StoreError> {
        ensure_unique(&self.shares, &record.name)?;
        let share = StoredShare::from_record(record);
        self.shares.push(share.clone());
        Ok(share)
    }

    fn list(&self) -> Vec<StoredShare> {
        self.shares.clone()
    }
}

/// Share collection kept as a gzip-compressed bincode snapshot on disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    shares: Vec<StoredShare>,
}

impl FileStore {
    /// Open the snapshot at `path`, starting empty if it does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let shares = if path.exists() {
            let decoder = GzDecoder::new(File::open(&path)?);
            let mut reader = BufReader::new(decoder);
            deserialize_from(&mut reader)?
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            Vec::new()
        };

        info!("opened share store {} with {} shares", path.display(), shares.len());
        Ok(FileStore { path, shares })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot written next to the store and renamed over it once complete
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn save(&self) -> Result<(), StoreError> {
        let temp_path = self.temp_path();
        let file = File::create(&temp_path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

        serialize_into(&mut encoder, &self.shares)?;
        encoder.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl ShareStore for FileStore {
    fn insert(&mut self, record: &ImportRecord) -> Result<StoredShare, StoreError> {
        ensure_unique(&self.shares, &record.name)?;
        let share = StoredShare::from_record(record);
        self.shares.push(share.clone());

        if let Err(e) = self.save() {
            self.shares.pop();
            return Err(e);
        }

        Ok(share)
    }

    fn list(&self) -> Vec<StoredShare> {
        self.shares.clone()
    }
}

/// Outcome of writing an accepted batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistReport {
    pub succeeded: usize,
    /// Share name and reason for every record that was not written
    pub failed: Vec<(String, String)>,
}

/// Write records one by one. A failing record is counted and skipped; the rest are still written.
pub fn persist_batch<S>(store: &mut S, records: &[ImportRecord]) -> PersistReport
where
    S: ShareStore + ?Sized,
{
    let mut report = PersistReport::default();

    for record in records {
        match store.insert(record) {
            Ok(_) => report.succeeded += 1,
            Err(e) => {
                warn!("failed to store share '{}': {}", record.name, e);
                report.failed.push((record.name.clone(), e.to_string()));
            }
        }
    }

    info!(
        "stored {} of {} shares ({} failed)",
        report.succeeded,
        records.len(),
        report.failed.len()
    );
    report
}
