//! Shared fixtures for integration tests
//!
//! Builds the router over an in-memory engine and provides an engine
//! wrapper that records traffic and injects slow or failing requests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use medicine_search::{
    api::{build_router, AppState},
    config::SearchConfig,
    dataset::DatasetLoader,
    engine::{BulkSummary, EngineError, EngineResult, IndexSchema, MemoryEngine, SearchEngine},
    indexing::{Initializer, RetryPolicy},
    search::CatalogService,
};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt;

pub const INDEX: &str = "medicines";

pub const HEADER: &str = "name,generic_name,manufacturer,category,price,dosage,description";

/// Sample catalog shipped with the service
pub fn sample_dataset() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/medicines.csv")
}

/// Temporary CSV with `rows` generated records
pub fn generated_dataset(rows: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for i in 0..rows {
        writeln!(
            file,
            "Medicine {i},Generic {i},Maker {},Category {},{}.50,10mg,Generated record {i}",
            i % 4,
            i % 3,
            i + 1
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay: Duration::from_millis(1),
    }
}

/// [`MemoryEngine`] wrapper recording bulk requests and schema calls
#[derive(Clone, Default)]
pub struct RecordingEngine {
    pub inner: MemoryEngine,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    reject_search: Arc<AtomicBool>,
    /// 1-based bulk call to reject; 0 rejects none
    reject_bulk_call: Arc<AtomicUsize>,
    bulk_delay_ms: Arc<AtomicU64>,
    bulk_calls: Arc<AtomicUsize>,
    creates: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    refreshes: Arc<AtomicUsize>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document names per bulk request, in request order
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(Vec::len).collect()
    }

    /// Make every search request fail while the engine stays reachable
    pub fn reject_searches(&self, reject: bool) {
        self.reject_search.store(reject, Ordering::SeqCst);
    }

    /// Reject the `call`-th bulk request (counting from 1) with a 429
    pub fn reject_bulk_call(&self, call: usize) {
        self.reject_bulk_call.store(call, Ordering::SeqCst);
    }

    /// Hold every bulk request for `delay` before it reaches the index
    pub fn delay_bulk(&self, delay: Duration) {
        self.bulk_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchEngine for RecordingEngine {
    async fn ping(&self) -> EngineResult<()> {
        self.inner.ping().await
    }

    async fn index_exists(&self, index: &str) -> EngineResult<bool> {
        self.inner.index_exists(index).await
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> EngineResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_index(index, schema).await
    }

    async fn delete_index(&self, index: &str) -> EngineResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_index(index).await
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[Value],
        refresh: bool,
    ) -> EngineResult<BulkSummary> {
        let names = documents
            .iter()
            .map(|doc| doc["name"].as_str().unwrap_or_default().to_string())
            .collect();
        self.batches.lock().unwrap().push(names);
        let call = self.bulk_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = self.bulk_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if call == self.reject_bulk_call.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected {
                status: 429,
                reason: "es_rejected_execution_exception: rejected execution of bulk".to_string(),
            });
        }
        self.inner.bulk_index(index, documents, refresh).await
    }

    async fn refresh(&self, index: &str) -> EngineResult<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.inner.refresh(index).await
    }

    async fn search(&self, index: &str, body: &Value) -> EngineResult<Value> {
        if self.reject_search.load(Ordering::SeqCst) {
            return Err(EngineError::Rejected {
                status: 400,
                reason: "search_phase_execution_exception: all shards failed".to_string(),
            });
        }
        self.inner.search(index, body).await
    }
}

/// Router plus handles on what it runs against
pub struct TestApp {
    pub router: Router,
    pub initializer: Arc<Initializer>,
}

impl TestApp {
    pub fn new(engine: Arc<dyn SearchEngine>, dataset: &Path, policy: RetryPolicy) -> Self {
        let initializer = Initializer::new(engine.clone(), INDEX, DatasetLoader::new(dataset))
            .with_retry_policy(policy);
        Self::with_initializer(engine, initializer)
    }

    pub fn with_initializer(engine: Arc<dyn SearchEngine>, initializer: Initializer) -> Self {
        let initializer = Arc::new(initializer);
        let catalog = Arc::new(CatalogService::new(
            engine,
            initializer.clone(),
            &SearchConfig::default(),
        ));

        Self {
            router: build_router(AppState::new(catalog)),
            initializer,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, bytes) = self.get_raw(uri).await;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get_raw(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }
}

/// Parse Prometheus exposition text into metric name -> lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            if let Some(name) = line.split_whitespace().nth(2) {
                current_metric = name.to_string();
                metrics
                    .entry(current_metric.clone())
                    .or_insert_with(Vec::new)
                    .push(line.to_string());
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}
