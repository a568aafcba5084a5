//! Index (re)creation

use crate::engine::{IndexSchema, SearchEngine};
use crate::error::{AppError, Result, SchemaOperation};
use std::sync::Arc;
use tracing::info;

/// Drops and recreates the target index so its mappings always match the schema
#[derive(Clone)]
pub struct IndexLifecycleManager {
    engine: Arc<dyn SearchEngine>,
}

impl IndexLifecycleManager {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }

    /// Ensure `index` exists with exactly `schema`, discarding any existing data
    ///
    /// If the delete succeeds but the create fails the index is left absent,
    /// which the next call handles like any other missing index.
    pub async fn ensure_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        let exists = self
            .engine
            .index_exists(index)
            .await
            .map_err(|e| schema_error(SchemaOperation::Exists, index, e))?;
        info!(index, exists, "Checked index existence");

        if exists {
            info!(index, "Index already exists, deleting");
            self.engine
                .delete_index(index)
                .await
                .map_err(|e| schema_error(SchemaOperation::Delete, index, e))?;
            info!(index, "Index deleted");
        }

        self.engine
            .create_index(index, schema)
            .await
            .map_err(|e| schema_error(SchemaOperation::Create, index, e))?;
        info!(index, "Index created");

        Ok(())
    }
}

fn schema_error(operation: SchemaOperation, index: &str, err: impl std::fmt::Display) -> AppError {
    AppError::SchemaOperationFailed {
        operation,
        index: index.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use serde_json::json;

    #[tokio::test]
    async fn test_creates_missing_index() {
        let engine = MemoryEngine::new();
        let manager = IndexLifecycleManager::new(Arc::new(engine.clone()));

        manager
            .ensure_index("medicines", &IndexSchema::medicines())
            .await
            .unwrap();

        assert!(engine.index_exists("medicines").await.unwrap());
    }

    #[tokio::test]
    async fn test_recreate_discards_existing_documents() {
        let engine = MemoryEngine::new();
        let manager = IndexLifecycleManager::new(Arc::new(engine.clone()));
        let schema = IndexSchema::medicines();

        manager.ensure_index("medicines", &schema).await.unwrap();
        engine
            .bulk_index("medicines", &[json!({ "name": "Old" })], true)
            .await
            .unwrap();
        assert_eq!(engine.document_count("medicines"), 1);

        manager.ensure_index("medicines", &schema).await.unwrap();
        assert_eq!(engine.document_count("medicines"), 0);
    }

    #[tokio::test]
    async fn test_unreachable_engine_reports_schema_failure() {
        let engine = MemoryEngine::new();
        engine.set_available(false);
        let manager = IndexLifecycleManager::new(Arc::new(engine));

        let err = manager
            .ensure_index("medicines", &IndexSchema::medicines())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::SchemaOperationFailed {
                operation: SchemaOperation::Exists,
                ..
            }
        ));
    }
}
