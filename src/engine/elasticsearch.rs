use crate::engine::error::{EngineError, EngineResult};
use crate::engine::schema::IndexSchema;
use crate::engine::{BulkSummary, SearchEngine};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Elasticsearch REST client
#[derive(Clone)]
pub struct ElasticsearchEngine {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

impl ElasticsearchEngine {
    /// Create a client for the cluster at `url`, authenticating with `api_key` when given
    pub fn new(url: &str, api_key: Option<String>, timeout_secs: u64) -> EngineResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(&format!("ApiKey {}", key)).map_err(|e| {
                EngineError::InvalidConfiguration(format!("API key is not a valid header: {}", e))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .user_agent(concat!("medicine-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                EngineError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-2xx response into [`EngineError::Rejected`]
    async fn check(response: Response) -> EngineResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(EngineError::from_error_body(status.as_u16(), &body))
    }

    fn bulk_body(index: &str, documents: &[Value]) -> EngineResult<String> {
        let action = serde_json::to_string(&json!({ "index": { "_index": index } }))?;

        let mut body = String::new();
        for document in documents {
            body.push_str(&action);
            body.push('\n');
            body.push_str(&serde_json::to_string(document)?);
            body.push('\n');
        }
        Ok(body)
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchEngine {
    async fn ping(&self) -> EngineResult<()> {
        let response = self.client.get(self.url("")).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> EngineResult<bool> {
        let response = self.client.head(self.url(index)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(EngineError::rejected(
                status.as_u16(),
                format!("unexpected status for index exists check on '{}'", index),
            )),
        }
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> EngineResult<()> {
        let response = self
            .client
            .put(self.url(index))
            .json(&schema.to_create_body())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> EngineResult<()> {
        let response = self.client.delete(self.url(index)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[Value],
        refresh: bool,
    ) -> EngineResult<BulkSummary> {
        let body = Self::bulk_body(index, documents)?;

        let response = self
            .client
            .post(self.url(&format!("{}/_bulk", index)))
            .query(&[("refresh", refresh)])
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        let response: BulkResponse = Self::check(response).await?.json().await?;

        let failed = if response.errors {
            response
                .items
                .iter()
                .filter(|item| {
                    item.get("index")
                        .and_then(|action| action.get("error"))
                        .is_some()
                })
                .count()
        } else {
            0
        };

        if failed > 0 {
            warn!(index, failed, "Bulk request reported per-document failures");
        }
        debug!(index, documents = documents.len(), refresh, "Bulk request accepted");

        Ok(BulkSummary {
            indexed: documents.len().saturating_sub(failed),
            failed,
        })
    }

    async fn refresh(&self, index: &str) -> EngineResult<()> {
        let response = self
            .client
            .post(self.url(&format!("{}/_refresh", index)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value) -> EngineResult<Value> {
        let response = self
            .client
            .post(self.url(&format!("{}/_search", index)))
            .json(body)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }
}
