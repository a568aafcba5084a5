//! Catalog read operations

use crate::config::SearchConfig;
use crate::engine::SearchEngine;
use crate::error::{AppError, QueryOperation, Result};
use crate::indexing::Initializer;
use crate::metrics::{QUERIES_TOTAL, QUERY_DURATION_SECONDS};
use crate::search::query::{Facets, QueryTranslator, SearchParams, SearchResults};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// Filters, autocomplete and keyword search over the medicine index
///
/// Every operation first passes the readiness gate, so a missing index is
/// rebuilt on demand and an unreachable engine fails fast.
pub struct CatalogService {
    engine: Arc<dyn SearchEngine>,
    initializer: Arc<Initializer>,
    translator: QueryTranslator,
}

impl CatalogService {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        initializer: Arc<Initializer>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            engine,
            initializer,
            translator: QueryTranslator::new(config),
        }
    }

    /// Distinct categories and manufacturers
    pub async fn facets(&self) -> Result<Facets> {
        let op = QueryOperation::Facets;
        self.instrumented(op, async {
            self.initializer.ensure_ready().await?;
            let response = self.execute(op, &self.translator.facets_body()).await?;
            self.translator.parse_facets(&response)
        })
        .await
    }

    /// Suggestion texts for a name prefix; no prefix yields no suggestions
    pub async fn autocomplete(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let op = QueryOperation::Autocomplete;
        self.instrumented(op, async {
            self.initializer.ensure_ready().await?;

            let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
                return Ok(Vec::new());
            };

            let response = self
                .execute(op, &self.translator.autocomplete_body(prefix))
                .await?;
            self.translator.parse_suggestions(&response)
        })
        .await
    }

    /// Fuzzy keyword search with exact category/manufacturer filters
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        let op = QueryOperation::Search;
        self.instrumented(op, async {
            self.initializer.ensure_ready().await?;

            let body = self.translator.search_body(params);
            debug!(query = %body, "Executing search query");

            let response = self.execute(op, &body).await?;
            self.translator.parse_search(&response)
        })
        .await
    }

    async fn execute(&self, op: QueryOperation, body: &Value) -> Result<Value> {
        self.engine
            .search(self.initializer.index(), body)
            .await
            .map_err(|e| AppError::query(op, e))
    }

    async fn instrumented<T, F>(&self, op: QueryOperation, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timer = QUERY_DURATION_SECONDS
            .with_label_values(&[op.as_str()])
            .start_timer();
        let result = fut.await;
        timer.observe_duration();

        let status = match &result {
            Ok(_) => "success",
            Err(e) => {
                error!(operation = op.as_str(), error = %e, "Catalog query failed");
                "failure"
            }
        };
        QUERIES_TOTAL.with_label_values(&[op.as_str(), status]).inc();

        result
    }
}
