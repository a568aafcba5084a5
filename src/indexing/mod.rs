//! Index lifecycle, bulk import and initialization orchestration
//!
//! ```text
//! Initializer ──► ping ──► IndexLifecycleManager ──► DatasetLoader ──► BulkImporter
//!      ▲            (drop + create with IndexSchema)                (batches, refresh)
//!      └──────────── fixed-delay retry, at most RetryPolicy::max_attempts ─────┘
//! ```

mod importer;
mod initializer;
mod lifecycle;

pub use importer::{BulkImporter, ImportSummary};
pub use initializer::{InitPhase, InitReport, Initializer, RetryPolicy};
pub use lifecycle::IndexLifecycleManager;
