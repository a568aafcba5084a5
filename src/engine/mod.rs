//! Search engine client seam
//!
//! Every component talks to the external engine through [`SearchEngine`],
//! constructed once at startup and shared as `Arc<dyn SearchEngine>`:
//!
//! - [`ElasticsearchEngine`]: the production client, speaking the
//!   Elasticsearch REST API over `reqwest`.
//! - [`MemoryEngine`]: an in-process double used by tests and for running
//!   the service without a cluster.
//!
//! Request bodies are engine query DSL (`serde_json::Value`) built by
//! [`crate::search::QueryTranslator`]; this layer only moves them over the wire.

mod elasticsearch;
mod error;
mod memory;
mod schema;

pub use elasticsearch::ElasticsearchEngine;
pub use error::{EngineError, EngineResult};
pub use memory::MemoryEngine;
pub use schema::{FieldType, IndexSchema};

use crate::config::{EngineBackend, EngineConfig};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of an accepted bulk request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Documents the engine acknowledged
    pub indexed: usize,

    /// Documents the engine rejected individually
    pub failed: usize,
}

/// Operations consumed from the external search engine
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Cluster liveness
    async fn ping(&self) -> EngineResult<()>;

    /// Whether `index` exists
    async fn index_exists(&self, index: &str) -> EngineResult<bool>;

    /// Create `index` with its field mappings in one request
    async fn create_index(&self, index: &str, schema: &IndexSchema) -> EngineResult<()>;

    /// Drop `index` and all of its documents
    async fn delete_index(&self, index: &str) -> EngineResult<()>;

    /// Index `documents` in one bulk request, optionally refreshing before returning
    async fn bulk_index(
        &self,
        index: &str,
        documents: &[Value],
        refresh: bool,
    ) -> EngineResult<BulkSummary>;

    /// Make previously written documents visible to search
    async fn refresh(&self, index: &str) -> EngineResult<()>;

    /// Run a search request body and return the raw response
    async fn search(&self, index: &str, body: &Value) -> EngineResult<Value>;
}

/// Build the engine selected in configuration
pub fn create_engine(config: &EngineConfig) -> EngineResult<Arc<dyn SearchEngine>> {
    match config.backend {
        EngineBackend::Elasticsearch => {
            let engine = ElasticsearchEngine::new(
                &config.url,
                config.api_key(),
                config.timeout_secs,
            )?;
            tracing::info!(url = %config.url, "Using Elasticsearch engine");
            Ok(Arc::new(engine))
        }
        EngineBackend::Memory => {
            tracing::info!("Using in-memory engine");
            Ok(Arc::new(MemoryEngine::new()))
        }
    }
}
