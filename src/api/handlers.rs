use crate::api::AppState;
use crate::error::AppError;
use crate::models::SearchHit;
use crate::search::SearchParams;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Catalog endpoint a failure is reported for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Filters,
    Autocomplete,
    Search,
}

impl Endpoint {
    fn message(self) -> &'static str {
        match self {
            Endpoint::Filters => "Failed to fetch filters",
            Endpoint::Autocomplete => "Autocomplete failed",
            Endpoint::Search => "Search failed",
        }
    }

    /// Payload fields present, empty, in every failure body
    fn empty_payload(self) -> &'static [&'static str] {
        match self {
            Endpoint::Filters => &["categories", "manufacturers"],
            Endpoint::Autocomplete => &["suggestions"],
            Endpoint::Search => &["hits"],
        }
    }
}

/// Failure of a catalog endpoint, rendered as the uniform error envelope
#[derive(Debug)]
pub struct ApiError {
    pub endpoint: Endpoint,
    pub source: AppError,
}

impl ApiError {
    fn wrap(endpoint: Endpoint) -> impl FnOnce(AppError) -> Self {
        move |source| Self { endpoint, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.source.status_code();
        let error_code = self.source.error_code();
        let details = self.source.to_string();

        tracing::error!(
            error_code = error_code,
            status_code = status.as_u16(),
            message = %details,
            "Request error"
        );

        let mut body = Map::new();
        body.insert("error".into(), json!(self.endpoint.message()));
        body.insert("code".into(), json!(error_code));
        body.insert("details".into(), json!(details));
        for field in self.endpoint.empty_payload() {
            body.insert((*field).into(), json!([]));
        }

        (status, Json(Value::Object(body))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Health check endpoint; never consults the engine
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Distinct categories and manufacturers
pub async fn filters(State(state): State<AppState>) -> ApiResult<FiltersResponse> {
    let facets = state
        .catalog
        .facets()
        .await
        .map_err(ApiError::wrap(Endpoint::Filters))?;

    Ok(Json(FiltersResponse {
        categories: facets.categories,
        manufacturers: facets.manufacturers,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FiltersResponse {
    pub categories: Vec<String>,
    pub manufacturers: Vec<String>,
}

/// Name suggestions for a prefix
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteQuery>,
) -> ApiResult<SuggestionsResponse> {
    let suggestions = state
        .catalog
        .autocomplete(params.q.as_deref())
        .await
        .map_err(ApiError::wrap(Endpoint::Autocomplete))?;

    Ok(Json(SuggestionsResponse { suggestions }))
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

/// Keyword search with optional exact filters
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResponse> {
    let results = state
        .catalog
        .search(&params)
        .await
        .map_err(ApiError::wrap(Endpoint::Search))?;

    Ok(Json(SearchResponse {
        total: results.total,
        hits: results.hits,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}
