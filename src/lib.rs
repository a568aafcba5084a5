//! Medicine catalog search service
//!
//! Loads a medicine dataset into a search engine index and serves filter
//! facets, name autocomplete and fuzzy keyword search over HTTP.

pub mod api;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod indexing;
pub mod metrics;
pub mod models;
pub mod search;

pub use error::{AppError, Result};
