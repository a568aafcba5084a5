//! In-process engine
//!
//! Holds indices in a [`DashMap`] and evaluates the subset of the query DSL
//! that this service emits: `match_all`, `multi_match` with `AUTO`
//! fuzziness, `term`, `bool` (`must` + `filter`), `terms` aggregations and
//! `completion` suggesters. Matching is a rough approximation of the real
//! analyzers (lowercased alphanumeric tokens, Levenshtein edits).
//!
//! Written documents stay invisible until a refresh, mirroring the engine's
//! near-real-time visibility. [`MemoryEngine::set_available`] simulates an
//! outage: every call fails with a transport error while unavailable.

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::schema::{FieldType, IndexSchema};
use crate::engine::{BulkSummary, SearchEngine};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

const DEFAULT_SIZE: usize = 10;

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    source: Value,
}

#[derive(Debug)]
struct MemoryIndex {
    schema: IndexSchema,
    visible: Vec<StoredDocument>,
    pending: Vec<StoredDocument>,
}

impl MemoryIndex {
    fn refresh(&mut self) {
        self.visible.append(&mut self.pending);
    }
}

/// In-memory [`SearchEngine`]
#[derive(Clone, Default)]
pub struct MemoryEngine {
    indices: Arc<DashMap<String, MemoryIndex>>,
    unavailable: Arc<AtomicBool>,
    next_id: Arc<AtomicU64>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the engine going down (`false`) or coming back (`true`)
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, AtomicOrdering::SeqCst);
    }

    /// Number of searchable documents in `index`
    pub fn document_count(&self, index: &str) -> usize {
        self.indices
            .get(index)
            .map(|idx| idx.visible.len())
            .unwrap_or(0)
    }

    /// Number of written but not yet refreshed documents in `index`
    pub fn pending_count(&self, index: &str) -> usize {
        self.indices
            .get(index)
            .map(|idx| idx.pending.len())
            .unwrap_or(0)
    }

    fn guard(&self) -> EngineResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            Err(EngineError::Transport(
                "error trying to connect: Connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn index_not_found(index: &str) -> EngineError {
        EngineError::rejected(
            404,
            format!("index_not_found_exception: no such index [{}]", index),
        )
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn ping(&self) -> EngineResult<()> {
        self.guard()
    }

    async fn index_exists(&self, index: &str) -> EngineResult<bool> {
        self.guard()?;
        Ok(self.indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> EngineResult<()> {
        self.guard()?;
        if self.indices.contains_key(index) {
            return Err(EngineError::rejected(
                400,
                format!(
                    "resource_already_exists_exception: index [{}] already exists",
                    index
                ),
            ));
        }

        self.indices.insert(
            index.to_string(),
            MemoryIndex {
                schema: schema.clone(),
                visible: Vec::new(),
                pending: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> EngineResult<()> {
        self.guard()?;
        self.indices
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| Self::index_not_found(index))
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[Value],
        refresh: bool,
    ) -> EngineResult<BulkSummary> {
        self.guard()?;
        let mut idx = self
            .indices
            .get_mut(index)
            .ok_or_else(|| Self::index_not_found(index))?;

        let mut summary = BulkSummary::default();
        for document in documents {
            if !document.is_object() {
                summary.failed += 1;
                continue;
            }

            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst).to_string();
            idx.pending.push(StoredDocument {
                id,
                source: document.clone(),
            });
            summary.indexed += 1;
        }

        if refresh {
            idx.refresh();
        }
        Ok(summary)
    }

    async fn refresh(&self, index: &str) -> EngineResult<()> {
        self.guard()?;
        let mut idx = self
            .indices
            .get_mut(index)
            .ok_or_else(|| Self::index_not_found(index))?;
        idx.refresh();
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value) -> EngineResult<Value> {
        self.guard()?;
        let idx = self
            .indices
            .get(index)
            .ok_or_else(|| Self::index_not_found(index))?;

        execute(index, &idx, body)
    }
}

fn execute(index_name: &str, index: &MemoryIndex, body: &Value) -> EngineResult<Value> {
    let match_all = json!({ "match_all": {} });
    let query = body.get("query").unwrap_or(&match_all);

    let mut matched: Vec<(f64, &StoredDocument)> = Vec::new();
    for doc in &index.visible {
        if let Some(score) = score(query, &doc.source)? {
            matched.push((score, doc));
        }
    }
    // Stable sort keeps insertion order among equal scores.
    matched.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let size = usize_param(body, "size")?.unwrap_or(DEFAULT_SIZE);
    let from = usize_param(body, "from")?.unwrap_or(0);

    let hits: Vec<Value> = matched
        .iter()
        .skip(from)
        .take(size)
        .map(|(score, doc)| {
            json!({
                "_index": index_name,
                "_id": doc.id,
                "_score": score,
                "_source": doc.source,
            })
        })
        .collect();

    let max_score = matched.first().map(|(score, _)| *score);

    let mut response = json!({
        "took": 0,
        "timed_out": false,
        "hits": {
            "total": { "value": matched.len(), "relation": "eq" },
            "max_score": max_score,
            "hits": hits,
        }
    });

    if let Some(aggs) = body.get("aggs").or_else(|| body.get("aggregations")) {
        let docs: Vec<&Value> = matched.iter().map(|(_, doc)| &doc.source).collect();
        response["aggregations"] = aggregate(aggs, &docs)?;
    }

    if let Some(suggest) = body.get("suggest") {
        response["suggest"] = suggest_completions(index_name, index, suggest)?;
    }

    Ok(response)
}

fn usize_param(body: &Value, key: &str) -> EngineResult<Option<usize>> {
    match body.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| parsing_error(format!("[{}] must be a non-negative integer", key))),
    }
}

fn parsing_error(reason: impl Into<String>) -> EngineError {
    EngineError::rejected(400, format!("parsing_exception: {}", reason.into()))
}

/// Score `doc` against `query`; `None` when it does not match
fn score(query: &Value, doc: &Value) -> EngineResult<Option<f64>> {
    let (kind, params) = query
        .as_object()
        .filter(|obj| obj.len() == 1)
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| parsing_error("query must hold exactly one clause"))?;

    match kind.as_str() {
        "match_all" => Ok(Some(1.0)),
        "term" => term_matches(params, doc).map(|hit| hit.then_some(1.0)),
        "multi_match" => multi_match(params, doc),
        "bool" => bool_query(params, doc),
        other => Err(parsing_error(format!("unknown query [{}]", other))),
    }
}

fn clauses(params: &Value, key: &str) -> Vec<Value> {
    match params.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn bool_query(params: &Value, doc: &Value) -> EngineResult<Option<f64>> {
    for filter in clauses(params, "filter") {
        if score(&filter, doc)?.is_none() {
            return Ok(None);
        }
    }

    let mut total = 0.0;
    for must in clauses(params, "must") {
        match score(&must, doc)? {
            Some(s) => total += s,
            None => return Ok(None),
        }
    }
    Ok(Some(total))
}

fn term_matches(params: &Value, doc: &Value) -> EngineResult<bool> {
    let (field, expected) = params
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| parsing_error("[term] query malformed"))?;

    let expected = expected.get("value").unwrap_or(expected);
    Ok(doc.get(field) == Some(expected))
}

fn multi_match(params: &Value, doc: &Value) -> EngineResult<Option<f64>> {
    let query = params
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| parsing_error("[multi_match] requires query"))?;
    let fuzzy = params.get("fuzziness").and_then(Value::as_str) == Some("AUTO");

    let fields: Vec<&str> = params
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let doc_tokens: Vec<String> = fields
        .iter()
        .filter_map(|field| doc.get(*field).and_then(Value::as_str))
        .flat_map(tokenize)
        .collect();

    let matched = tokenize(query)
        .iter()
        .filter(|term| {
            doc_tokens
                .iter()
                .any(|token| token_matches(term, token, fuzzy))
        })
        .count();

    Ok((matched > 0).then_some(matched as f64))
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Edits allowed by `AUTO` fuzziness for a term of `len` characters
fn auto_edits(len: usize) -> usize {
    match len {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn token_matches(term: &str, token: &str, fuzzy: bool) -> bool {
    if term == token {
        return true;
    }
    fuzzy && strsim::levenshtein(term, token) <= auto_edits(term.chars().count())
}

fn aggregate(aggs: &Value, docs: &[&Value]) -> EngineResult<Value> {
    let aggs = aggs
        .as_object()
        .ok_or_else(|| parsing_error("[aggs] must be an object"))?;

    let mut out = Map::new();
    for (name, agg) in aggs {
        let terms = agg
            .get("terms")
            .ok_or_else(|| parsing_error(format!("unsupported aggregation [{}]", name)))?;
        let field = terms
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| parsing_error("[terms] requires field"))?;
        let size = usize_param(terms, "size")?.unwrap_or(DEFAULT_SIZE);

        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for doc in docs {
            if let Some(key) = doc.get(field).and_then(Value::as_str) {
                *counts.entry(key.to_string()).or_default() += 1;
            }
        }

        let mut buckets: Vec<(String, u64)> = counts.into_iter().collect();
        // Most frequent first, then by key; BTreeMap already ordered keys.
        buckets.sort_by(|a, b| b.1.cmp(&a.1));

        let buckets: Vec<Value> = buckets
            .into_iter()
            .take(size)
            .map(|(key, count)| json!({ "key": key, "doc_count": count }))
            .collect();

        out.insert(
            name.clone(),
            json!({
                "doc_count_error_upper_bound": 0,
                "sum_other_doc_count": 0,
                "buckets": buckets,
            }),
        );
    }

    Ok(Value::Object(out))
}

fn suggest_completions(index_name: &str, index: &MemoryIndex, suggest: &Value) -> EngineResult<Value> {
    let suggest = suggest
        .as_object()
        .ok_or_else(|| parsing_error("[suggest] must be an object"))?;

    let mut out = Map::new();
    for (name, suggester) in suggest {
        let prefix = suggester
            .get("prefix")
            .and_then(Value::as_str)
            .ok_or_else(|| parsing_error(format!("suggester [{}] requires prefix", name)))?;
        let completion = suggester
            .get("completion")
            .ok_or_else(|| parsing_error(format!("suggester [{}] must be completion", name)))?;
        let field = completion
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| parsing_error("[completion] requires field"))?;

        if index.schema.field_type(field) != Some(FieldType::Completion) {
            return Err(EngineError::rejected(
                400,
                format!(
                    "illegal_argument_exception: Field [{}] is not a completion suggest field",
                    field
                ),
            ));
        }

        let fuzzy = completion.get("fuzzy").is_some();
        let size = usize_param(completion, "size")?.unwrap_or(5);
        let needle = prefix.to_lowercase();

        let mut options: Vec<(u64, String, &StoredDocument)> = Vec::new();
        for doc in &index.visible {
            let Some(entry) = doc.source.get(field) else {
                continue;
            };
            let weight = entry.get("weight").and_then(Value::as_u64).unwrap_or(1);
            let inputs = entry
                .get("input")
                .and_then(Value::as_array)
                .map(|inputs| inputs.iter().filter_map(Value::as_str).collect::<Vec<_>>())
                .unwrap_or_default();

            // One option per document: its first matching input.
            if let Some(text) = inputs
                .into_iter()
                .find(|input| prefix_matches(&needle, &input.to_lowercase(), fuzzy))
            {
                options.push((weight, text.to_string(), doc));
            }
        }

        options.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let options: Vec<Value> = options
            .into_iter()
            .take(size)
            .map(|(weight, text, doc)| {
                json!({
                    "text": text,
                    "_index": index_name,
                    "_id": doc.id,
                    "_score": weight as f64,
                    "_source": doc.source,
                })
            })
            .collect();

        out.insert(
            name.clone(),
            json!([{
                "text": prefix,
                "offset": 0,
                "length": prefix.chars().count(),
                "options": options,
            }]),
        );
    }

    Ok(Value::Object(out))
}

/// Completion prefix match; fuzzy matching needs three characters and an exact first character
fn prefix_matches(prefix: &str, input: &str, fuzzy: bool) -> bool {
    if input.starts_with(prefix) {
        return true;
    }

    let prefix_chars: Vec<char> = prefix.chars().collect();
    if !fuzzy || prefix_chars.len() < 3 || input.chars().next() != prefix_chars.first().copied() {
        return false;
    }

    let edits = auto_edits(prefix_chars.len());
    let input_chars: Vec<char> = input.chars().collect();
    let lo = prefix_chars.len().saturating_sub(edits);
    let hi = (prefix_chars.len() + edits).min(input_chars.len());

    (lo..=hi).any(|len| {
        let candidate: String = input_chars[..len].iter().collect();
        strsim::levenshtein(prefix, &candidate) <= edits
    })
}
