//! Product search tool.
//!
//! The tool parses the model's arguments and hands a [`SearchQuery`] to a
//! [`SearchBackend`]. The output is the JSON array of matching products, in
//! the order the backend ranked them.

use std::sync::Arc;

use async_trait::async_trait;
use shopassist_core::catalog::Product;
use shopassist_core::error::ToolError;
use shopassist_core::tool::{Tool, ToolResult};
use tracing::debug;

pub const DEFAULT_ITEMS: usize = 10;
const MAX_ITEMS: usize = 50;

/// A parsed search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    /// Maximum number of products to return
    pub items: usize,
    /// Backend-specific filter expression
    pub filter: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            items: DEFAULT_ITEMS,
            filter: None,
        }
    }

    /// Parse tool-call arguments: `query` (required), `items`, `filter`.
    pub fn from_arguments(arguments: &serde_json::Value) -> Result<Self, ToolError> {
        let query = arguments["query"]
            .as_str()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let items = arguments["items"]
            .as_u64()
            .map_or(DEFAULT_ITEMS, |n| (n as usize).clamp(1, MAX_ITEMS));

        let filter = arguments["filter"]
            .as_str()
            .filter(|f| !f.trim().is_empty())
            .map(String::from);

        Ok(Self {
            query: query.to_string(),
            items,
            filter,
        })
    }
}

/// Where products come from.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Products matching `query`, best first, at most `query.items` of them.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, ToolError>;
}

/// The `search` tool exposed to the model.
pub struct SearchTool {
    backend: Arc<dyn SearchBackend>,
}

impl SearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Makes a call to the product database and returns the most relevant products."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search words from the user"
                },
                "items": {
                    "type": "integer",
                    "description": "Number of items to return (default 10)",
                    "default": DEFAULT_ITEMS
                },
                "filter": {
                    "type": "string",
                    "description": "Filter to apply to the search"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = SearchQuery::from_arguments(&arguments)?;
        debug!(backend = self.backend.name(), query = %query.query, items = query.items, "Searching products");

        let mut products = self.backend.search(&query).await?;
        products.truncate(query.items);

        let data = serde_json::to_value(&products).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "search".into(),
            reason: e.to_string(),
        })?;

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: data.to_string(),
        })
    }
}
