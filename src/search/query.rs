//! Query translation
//!
//! Builds engine request bodies for the three catalog reads and maps the
//! engine's responses back into stable shapes.

use crate::config::SearchConfig;
use crate::error::{AppError, QueryOperation, Result};
use crate::models::{MedicineRecord, SearchHit, SUGGEST_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Fields matched by free-text search
pub const TEXT_FIELDS: [&str; 3] = ["name", "generic_name", "description"];

const CATEGORIES_AGG: &str = "categories";
const MANUFACTURERS_AGG: &str = "manufacturers";

/// Parameters of a keyword search; absent or empty values mean "no constraint"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
}

impl SearchParams {
    pub fn text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref().filter(|m| !m.is_empty())
    }
}

/// Distinct filter values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    pub categories: Vec<String>,
    pub manufacturers: Vec<String>,
}

/// Keyword search result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct TermsAggregation {
    buckets: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct Bucket {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SuggestEntry {
    #[serde(default)]
    options: Vec<SuggestOption>,
}

#[derive(Debug, Deserialize)]
struct SuggestOption {
    text: String,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: Total,
    hits: Vec<RawHit>,
}

/// Object form since Elasticsearch 7, bare count before
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Total {
    Object { value: u64 },
    Count(u64),
}

impl Total {
    fn value(&self) -> u64 {
        match self {
            Total::Object { value } => *value,
            Total::Count(count) => *count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: MedicineRecord,
}

/// Translates catalog reads to and from the engine query DSL
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    facet_size: usize,
    suggestion_size: usize,
    max_hits: usize,
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl QueryTranslator {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            facet_size: config.facet_size,
            suggestion_size: config.suggestion_size,
            max_hits: config.max_hits,
        }
    }

    /// Aggregation-only request for category and manufacturer values
    pub fn facets_body(&self) -> Value {
        json!({
            "size": 0,
            "aggs": {
                CATEGORIES_AGG: { "terms": { "field": "category", "size": self.facet_size } },
                MANUFACTURERS_AGG: { "terms": { "field": "manufacturer", "size": self.facet_size } },
            }
        })
    }

    pub fn parse_facets(&self, response: &Value) -> Result<Facets> {
        let op = QueryOperation::Facets;
        let aggregations = response
            .get("aggregations")
            .ok_or_else(|| AppError::query(op, "No aggregations in response"))?;

        let keys = |name: &str| -> Result<Vec<String>> {
            let agg = aggregations
                .get(name)
                .ok_or_else(|| AppError::query(op, format!("Missing aggregation '{}'", name)))?;
            let terms = TermsAggregation::deserialize(agg).map_err(|e| AppError::query(op, e))?;
            Ok(terms.buckets.into_iter().map(|b| b.key).collect())
        };

        Ok(Facets {
            categories: keys(CATEGORIES_AGG)?,
            manufacturers: keys(MANUFACTURERS_AGG)?,
        })
    }

    /// Fuzzy completion request against the suggestion field
    pub fn autocomplete_body(&self, prefix: &str) -> Value {
        json!({
            "suggest": {
                SUGGEST_FIELD: {
                    "prefix": prefix,
                    "completion": {
                        "field": SUGGEST_FIELD,
                        "fuzzy": { "fuzziness": "AUTO" },
                        "size": self.suggestion_size,
                    }
                }
            }
        })
    }

    pub fn parse_suggestions(&self, response: &Value) -> Result<Vec<String>> {
        let op = QueryOperation::Autocomplete;
        let entries = response
            .get("suggest")
            .and_then(|suggest| suggest.get(SUGGEST_FIELD))
            .ok_or_else(|| AppError::query(op, "No suggestions in response"))?;

        let entries =
            Vec::<SuggestEntry>::deserialize(entries).map_err(|e| AppError::query(op, e))?;

        Ok(entries
            .into_iter()
            .flat_map(|entry| entry.options)
            .map(|option| option.text)
            .collect())
    }

    /// Fuzzy multi-field match (or match-all) combined with exact filters
    pub fn search_body(&self, params: &SearchParams) -> Value {
        let must = match params.text() {
            Some(q) => json!({
                "multi_match": {
                    "query": q,
                    "fields": TEXT_FIELDS,
                    "fuzziness": "AUTO",
                }
            }),
            None => json!({ "match_all": {} }),
        };

        let mut filter = Vec::new();
        if let Some(category) = params.category() {
            filter.push(json!({ "term": { "category": category } }));
        }
        if let Some(manufacturer) = params.manufacturer() {
            filter.push(json!({ "term": { "manufacturer": manufacturer } }));
        }

        json!({
            "size": self.max_hits,
            "query": {
                "bool": {
                    "must": [must],
                    "filter": filter,
                }
            }
        })
    }

    pub fn parse_search(&self, response: &Value) -> Result<SearchResults> {
        let op = QueryOperation::Search;
        let hits = response
            .get("hits")
            .ok_or_else(|| AppError::query(op, "No hits in response"))?;
        let envelope = HitsEnvelope::deserialize(hits).map_err(|e| AppError::query(op, e))?;

        Ok(SearchResults {
            total: envelope.total.value(),
            hits: envelope
                .hits
                .into_iter()
                .map(|hit| SearchHit {
                    record: hit.source,
                    score: hit.score,
                })
                .collect(),
        })
    }
}
