//! Dataset loading
//!
//! Reads the medicine catalog from a CSV file with a header row. The whole
//! file is materialized before an import starts; records are handed to the
//! importer and dropped when the import run ends.
//!
//! A malformed row is logged and skipped. Only an unreadable file fails
//! the load.

use crate::error::{AppError, Result};
use crate::models::MedicineRecord;
use csv::{ReaderBuilder, Trim};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Loads [`MedicineRecord`]s from a delimited file
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    path: PathBuf,
    delimiter: u8,
}

impl DatasetLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read every record, in file order
    pub fn load(&self) -> Result<Vec<MedicineRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(Trim::Headers)
            .from_path(&self.path)
            .map_err(|e| self.unreadable(e.to_string()))?;

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (row, result) in reader.deserialize::<MedicineRecord>().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) if e.is_io_error() => return Err(self.unreadable(e.to_string())),
                Err(e) => {
                    // Row 1 is the header.
                    warn!(row = row + 2, error = %e, "Skipping malformed dataset row");
                    skipped += 1;
                }
            }
        }

        debug!(path = %self.path.display(), "Dataset parsed");
        info!(records = records.len(), skipped, "CSV file read successfully");

        Ok(records)
    }

    fn unreadable(&self, reason: String) -> AppError {
        AppError::DatasetUnreadable {
            path: self.path.clone(),
            reason,
        }
    }
}
