//! Tool implementations for the shopping assistant.
//!
//! - `search` finds products through a [`SearchBackend`]: a hosted hybrid
//!   keyword/vector index, or the built-in static catalog.
//! - `findUser` returns the shopper's profile through a [`ProfileSource`].

pub mod find_user;
pub mod hybrid_index;
pub mod search;
pub mod static_catalog;

use std::sync::Arc;

use shopassist_config::SearchConfig;
use shopassist_core::provider::Provider;
use shopassist_core::tool::ToolRegistry;

pub use find_user::{FakeProfileGenerator, FindUserTool, ProfileSource};
pub use hybrid_index::HybridIndexBackend;
pub use search::{SearchBackend, SearchQuery, SearchTool};
pub use static_catalog::StaticCatalog;

/// Create the tool registry declared to the model: `search` and `findUser`.
pub fn default_registry(
    backend: Arc<dyn SearchBackend>,
    profiles: Arc<dyn ProfileSource>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchTool::new(backend)));
    registry.register(Box::new(FindUserTool::new(profiles)));
    registry
}

/// Pick the search backend for `config`: the hosted index when an endpoint
/// is set (with vector queries if `embedder` is given), otherwise the demo
/// catalog.
pub fn search_backend(
    config: &SearchConfig,
    embedder: Option<Arc<dyn Provider>>,
) -> Arc<dyn SearchBackend> {
    match HybridIndexBackend::from_config(config) {
        Some(index) => {
            let index = match embedder {
                Some(e) => index.with_embedder(e),
                None => index,
            };
            tracing::info!(index = %config.index, "Using hosted product index");
            Arc::new(index)
        }
        None => {
            tracing::info!("No search endpoint configured, using the demo catalog");
            Arc::new(StaticCatalog::demo())
        }
    }
}
