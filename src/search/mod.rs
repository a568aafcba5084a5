//! Catalog queries
//!
//! [`QueryTranslator`] owns the engine query DSL for the three reads;
//! [`CatalogService`] runs them behind the readiness gate.

mod query;
mod service;

pub use query::{Facets, QueryTranslator, SearchParams, SearchResults, TEXT_FIELDS};
pub use service::CatalogService;
