//! Startup and lazy initialization
//!
//! An attempt walks `CheckingHealth -> RecreatingIndex -> Importing -> Done`.
//! A failed attempt is retried from the health check after a fixed delay,
//! redoing the index recreation and the full import; nothing is resumed.
//! Whether the index is ready is always re-derived from the engine, never
//! remembered in process memory.

use crate::dataset::DatasetLoader;
use crate::engine::{IndexSchema, SearchEngine};
use crate::error::{AppError, Result, SchemaOperation};
use crate::indexing::importer::{BulkImporter, ImportSummary};
use crate::indexing::lifecycle::IndexLifecycleManager;
use crate::metrics::INITIALIZATION_ATTEMPTS_TOTAL;
use std::sync::Arc;
use std::time::Duration;
use strum::Display;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Phase reached by an initialization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum InitPhase {
    Unstarted,
    CheckingHealth,
    RecreatingIndex,
    Importing,
    Done,
}

/// Bounded retry with a fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Outcome of a successful initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitReport {
    /// Attempts used, including the successful one
    pub attempts: u32,
    pub import: ImportSummary,
}

/// Sequences health check, index recreation and import
pub struct Initializer {
    engine: Arc<dyn SearchEngine>,
    lifecycle: IndexLifecycleManager,
    importer: BulkImporter,
    loader: DatasetLoader,
    schema: IndexSchema,
    index: String,
    batch_size: usize,
    policy: RetryPolicy,
    /// Held for the whole of an initialization run
    in_flight: Mutex<()>,
}

impl Initializer {
    pub fn new(engine: Arc<dyn SearchEngine>, index: impl Into<String>, loader: DatasetLoader) -> Self {
        let index = index.into();
        Self {
            lifecycle: IndexLifecycleManager::new(engine.clone()),
            importer: BulkImporter::new(engine.clone(), index.clone()),
            engine,
            loader,
            schema: IndexSchema::medicines(),
            index,
            batch_size: 100,
            policy: RetryPolicy::default(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Recreate the index and import the dataset, retrying per the policy
    ///
    /// Waits for any initialization already in flight, then runs a full one.
    pub async fn initialize(&self) -> Result<InitReport> {
        let _guard = self.in_flight.lock().await;
        self.run_attempts().await
    }

    /// Gate for query paths: fail if the engine is down, initialize if the index is missing
    ///
    /// Initialization runs on its own task. A caller that stops waiting
    /// (a dropped request) does not cut the import short.
    pub async fn ensure_ready(self: &Arc<Self>) -> Result<()> {
        self.check_health().await?;
        if self.index_present().await? {
            return Ok(());
        }

        let this = Arc::clone(self);
        tokio::spawn(async move { this.initialize_if_missing().await })
            .await
            .map_err(|e| AppError::InitializationAborted(e.to_string()))?
    }

    async fn initialize_if_missing(&self) -> Result<()> {
        let _guard = self.in_flight.lock().await;
        // Another caller may have finished initializing while we waited.
        if self.index_present().await? {
            debug!(index = %self.index, "Index appeared while waiting for initialization");
            return Ok(());
        }

        info!(index = %self.index, "Index does not exist, initializing database");
        self.run_attempts().await.map(|_| ())
    }

    async fn run_attempts(&self) -> Result<InitReport> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut remaining = max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut phase = InitPhase::Unstarted;

            match self.attempt(&mut phase).await {
                Ok(import) => {
                    INITIALIZATION_ATTEMPTS_TOTAL
                        .with_label_values(&["success"])
                        .inc();
                    info!(
                        attempt,
                        documents = import.indexed,
                        "Database initialization completed successfully"
                    );
                    return Ok(InitReport {
                        attempts: attempt,
                        import,
                    });
                }
                Err(e) => {
                    remaining -= 1;
                    INITIALIZATION_ATTEMPTS_TOTAL
                        .with_label_values(&["failure"])
                        .inc();
                    error!(
                        attempt,
                        %phase,
                        remaining_attempts = remaining,
                        error = %e,
                        "Database initialization failed"
                    );

                    if remaining == 0 {
                        return Err(AppError::InitializationExhausted {
                            attempts: max_attempts,
                            last_error: e.to_string(),
                        });
                    }

                    info!(
                        delay_ms = self.policy.delay.as_millis() as u64,
                        "Retrying initialization"
                    );
                    sleep(self.policy.delay).await;
                }
            }
        }
    }

    async fn attempt(&self, phase: &mut InitPhase) -> Result<ImportSummary> {
        *phase = InitPhase::CheckingHealth;
        info!("Checking if search engine is accessible");
        self.check_health().await?;

        *phase = InitPhase::RecreatingIndex;
        self.lifecycle.ensure_index(&self.index, &self.schema).await?;

        *phase = InitPhase::Importing;
        let records = self.loader.load()?;
        let summary = self.importer.import_all(&records, self.batch_size).await?;

        *phase = InitPhase::Done;
        Ok(summary)
    }

    async fn check_health(&self) -> Result<()> {
        self.engine.ping().await.map_err(|e| {
            error!(error = %e, "Search engine is not accessible");
            AppError::unreachable(e.to_string())
        })?;
        debug!("Search engine is running");
        Ok(())
    }

    async fn index_present(&self) -> Result<bool> {
        self.engine
            .index_exists(&self.index)
            .await
            .map_err(|e| AppError::SchemaOperationFailed {
                operation: SchemaOperation::Exists,
                index: self.index.clone(),
                reason: e.to_string(),
            })
    }
}
