//! Batched bulk import

use crate::engine::SearchEngine;
use crate::error::{AppError, ImportStage, Result};
use crate::metrics::{DOCUMENTS_IMPORTED_TOTAL, IMPORT_BATCHES_TOTAL};
use crate::models::{MedicineDocument, MedicineRecord};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a completed import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Bulk requests issued
    pub batches: usize,

    /// Documents acknowledged by the engine
    pub indexed: usize,

    /// Documents the engine rejected individually
    pub failed: usize,
}

/// Pushes records into an index in fixed-size, strictly sequential batches
#[derive(Clone)]
pub struct BulkImporter {
    engine: Arc<dyn SearchEngine>,
    index: String,
}

impl BulkImporter {
    pub fn new(engine: Arc<dyn SearchEngine>, index: impl Into<String>) -> Self {
        Self {
            engine,
            index: index.into(),
        }
    }

    /// Import `records` in source order, `batch_size` per bulk request
    ///
    /// Each batch is refreshed before the next one starts. The first rejected
    /// batch aborts the run; batches already written stay in the index.
    pub async fn import_all(
        &self,
        records: &[MedicineRecord],
        batch_size: usize,
    ) -> Result<ImportSummary> {
        if batch_size == 0 {
            return Err(AppError::Configuration(
                "import batch size must be greater than zero".to_string(),
            ));
        }

        info!(
            index = %self.index,
            records = records.len(),
            batch_size,
            "Importing medicines"
        );

        let mut summary = ImportSummary::default();
        for (i, batch) in records.chunks(batch_size).enumerate() {
            let stage = ImportStage::Batch(i + 1);
            let documents = batch
                .iter()
                .map(|record| serde_json::to_value(MedicineDocument::from(record)))
                .collect::<std::result::Result<Vec<Value>, _>>()
                .map_err(|e| AppError::ImportBatchFailed {
                    stage,
                    reason: e.to_string(),
                })?;

            let result = self
                .engine
                .bulk_index(&self.index, &documents, true)
                .await
                .map_err(|e| AppError::ImportBatchFailed {
                    stage,
                    reason: e.to_string(),
                });

            let bulk = match result {
                Ok(bulk) => {
                    IMPORT_BATCHES_TOTAL.with_label_values(&["success"]).inc();
                    bulk
                }
                Err(e) => {
                    IMPORT_BATCHES_TOTAL.with_label_values(&["failure"]).inc();
                    return Err(e);
                }
            };

            summary.batches += 1;
            summary.indexed += bulk.indexed;
            summary.failed += bulk.failed;
            DOCUMENTS_IMPORTED_TOTAL.inc_by(bulk.indexed as f64);

            let first = i * batch_size + 1;
            info!(
                batch = i + 1,
                first,
                last = first + batch.len() - 1,
                "Imported batch of medicines"
            );
        }

        self.engine
            .refresh(&self.index)
            .await
            .map_err(|e| AppError::ImportBatchFailed {
                stage: ImportStage::FinalRefresh,
                reason: e.to_string(),
            })?;

        if summary.failed > 0 {
            warn!(
                failed = summary.failed,
                "Import completed with per-document failures"
            );
        }
        info!(
            batches = summary.batches,
            indexed = summary.indexed,
            "Data import completed successfully"
        );

        Ok(summary)
    }
}
