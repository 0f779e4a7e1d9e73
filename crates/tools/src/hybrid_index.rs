//! Hybrid keyword + vector search against a hosted product index.
//!
//! Requests go to `{endpoint}/indexes/{index}/docs/search?api-version=..`
//! with the keyword query in `search` and, when an embedder is attached, a
//! vector query over the index's embedding field.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use shopassist_config::SearchConfig;
use shopassist_core::catalog::Product;
use shopassist_core::error::ToolError;
use shopassist_core::provider::{EmbeddingRequest, Provider};
use tracing::{debug, warn};

use crate::search::{SearchBackend, SearchQuery};

const SELECT_FIELDS: &str =
    "id, title, category, subcategory, price, description_short, image_URL, title_URL";

pub struct HybridIndexBackend {
    endpoint: String,
    index: String,
    api_key: Option<String>,
    api_version: String,
    vector_field: String,
    k: u32,
    embedding_model: String,
    embedder: Option<Arc<dyn Provider>>,
    client: reqwest::Client,
}

impl HybridIndexBackend {
    /// Build from config. `None` when no endpoint is configured.
    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        let endpoint = config.endpoint.as_deref()?.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Some(Self {
            endpoint,
            index: config.index.clone(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            vector_field: config.vector_field.clone(),
            k: config.k,
            embedding_model: config.embedding_model.clone(),
            embedder: None,
            client,
        })
    }

    /// Attach an embedding provider to enable the vector half of the query.
    pub fn with_embedder(mut self, embedder: Arc<dyn Provider>) -> Self {
        if !self.embedding_model.is_empty() {
            self.embedder = Some(embedder);
        }
        self
    }

    fn search_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, self.index, self.api_version
        )
    }

    async fn embed(&self, embedder: &dyn Provider, text: &str) -> Result<Vec<f32>, ToolError> {
        let response = embedder
            .embed(EmbeddingRequest {
                model: self.embedding_model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| failed(format!("embedding failed: {e}")))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| failed("embedding response was empty".into()))
    }

    async fn request_body(&self, query: &SearchQuery) -> Result<serde_json::Value, ToolError> {
        let mut body = serde_json::json!({
            "search": query.query,
            "select": SELECT_FIELDS,
            "top": query.items,
        });

        if let Some(embedder) = &self.embedder {
            let vector = self.embed(embedder.as_ref(), &query.query).await?;
            body["vectorQueries"] = serde_json::json!([{
                "kind": "vector",
                "vector": vector,
                "fields": self.vector_field,
                "k": self.k,
                "exhaustive": true,
            }]);
        }

        if let Some(filter) = &query.filter {
            body["filter"] = serde_json::json!(filter);
        }

        Ok(body)
    }
}

#[async_trait]
impl SearchBackend for HybridIndexBackend {
    fn name(&self) -> &str {
        "hybrid-index"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, ToolError> {
        let body = self.request_body(query).await?;
        debug!(index = %self.index, vector = self.embedder.is_some(), "Querying product index");

        let mut request = self.client.post(self.search_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| failed(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Product index returned error");
            return Err(failed(format!("index returned {status}: {error_body}")));
        }

        let page: SearchPage = response
            .json()
            .await
            .map_err(|e| failed(format!("invalid search response: {e}")))?;

        let mut products = page.value;
        products.truncate(query.items);
        Ok(products)
    }
}

fn failed(reason: String) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: "search".into(),
        reason,
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    value: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopassist_core::error::ProviderError;
    use shopassist_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedEmbedder;

    #[async_trait]
    impl Provider for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("chat".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: vec![vec![0.25, 0.5]],
                model: request.model,
            })
        }
    }

    fn config(endpoint: &str) -> SearchConfig {
        SearchConfig {
            endpoint: Some(endpoint.to_string()),
            api_key: Some("search-key".into()),
            ..SearchConfig::default()
        }
    }

    fn page() -> serde_json::Value {
        serde_json::json!({
            "value": [
                {
                    "@search.score": 3.2,
                    "id": "1",
                    "title": "Robot Vacuum X1",
                    "category": "Home",
                    "subcategory": "Vacuums",
                    "price": 2999.0,
                    "description_short": "Self-emptying",
                    "image_URL": "https://img.example/x1.jpg",
                    "title_URL": "https://shop.example/x1"
                },
                {
                    "id": "2",
                    "title": "Stick Vacuum S2",
                    "category": "Home",
                    "price": 1999.0
                }
            ]
        })
    }

    #[test]
    fn no_endpoint_means_no_backend() {
        assert!(HybridIndexBackend::from_config(&SearchConfig::default()).is_none());
    }

    #[tokio::test]
    async fn keyword_search_wire_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/elkjop-demo/docs/search"))
            .and(query_param("api-version", "2023-11-01"))
            .and(header("api-key", "search-key"))
            .and(body_partial_json(serde_json::json!({
                "search": "vacuum",
                "select": SELECT_FIELDS,
                "filter": "price lt 3000"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(page()))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HybridIndexBackend::from_config(&config(&server.uri())).unwrap();
        let query = SearchQuery {
            filter: Some("price lt 3000".into()),
            ..SearchQuery::new("vacuum")
        };
        let products = backend.search(&query).await.unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].title, "Robot Vacuum X1");
        assert_eq!(products[0].link_url, "https://shop.example/x1");
        assert_eq!(products[1].description, "");
    }

    #[tokio::test]
    async fn null_columns_keep_the_page() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "value": [
                {
                    "id": "1",
                    "title": "Robot Vacuum X1",
                    "category": "Home",
                    "price": 2999.0,
                    "description_short": "Self-emptying",
                    "image_URL": "https://img.example/x1.jpg",
                    "title_URL": "https://shop.example/x1"
                },
                {
                    "id": "2",
                    "title": "Stick Vacuum S2",
                    "category": "Home",
                    "subcategory": null,
                    "price": null,
                    "description_short": null,
                    "image_URL": null,
                    "title_URL": null
                }
            ]
        });
        Mock::given(method("POST"))
            .and(path("/indexes/elkjop-demo/docs/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HybridIndexBackend::from_config(&config(&server.uri())).unwrap();
        let products = backend.search(&SearchQuery::new("vacuum")).await.unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[1].title, "Stick Vacuum S2");
        assert_eq!(products[1].price, 0.0);
        assert_eq!(products[1].description, "");
        assert_eq!(products[1].image_url, "");
        assert_eq!(products[1].link_url, "");
    }

    #[tokio::test]
    async fn vector_query_added_with_embedder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/elkjop-demo/docs/search"))
            .and(body_partial_json(serde_json::json!({
                "vectorQueries": [{
                    "kind": "vector",
                    "vector": [0.25, 0.5],
                    "fields": "contentVector",
                    "k": 5,
                    "exhaustive": true
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(page()))
            .expect(1)
            .mount(&server)
            .await;

        let backend = HybridIndexBackend::from_config(&config(&server.uri()))
            .unwrap()
            .with_embedder(Arc::new(FixedEmbedder));
        let query = SearchQuery {
            items: 1,
            ..SearchQuery::new("vacuum")
        };
        let products = backend.search(&query).await.unwrap();
        assert_eq!(products.len(), 1);
    }

    #[tokio::test]
    async fn http_error_is_execution_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let backend = HybridIndexBackend::from_config(&config(&server.uri())).unwrap();
        let err = backend.search(&SearchQuery::new("vacuum")).await.unwrap_err();
        match err {
            ToolError::ExecutionFailed { tool_name, reason } => {
                assert_eq!(tool_name, "search");
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
