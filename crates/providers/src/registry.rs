//! Provider registry: builds chat backends on first use and caches them.
//!
//! A backend is created once per provider key and reused by every later turn
//! in the process. The registry never falls back to a different backend: a
//! key we can't build is an error for the turn that asked for it.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use shopassist_config::{AppConfig, ModelProvider};
use shopassist_core::error::{Error, ProviderError, Result};
use shopassist_core::provider::Provider;
use tracing::{debug, info};

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Cache of constructed providers, keyed by provider.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<ModelProvider, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<ProviderRegistry> {
        static GLOBAL: OnceLock<Arc<ProviderRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(ProviderRegistry::new())).clone()
    }

    /// Get a cached provider.
    pub fn get(&self, key: ModelProvider) -> Option<Arc<dyn Provider>> {
        self.providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    /// Register a provider, replacing any cached one for the same key.
    pub fn insert(&self, key: ModelProvider, provider: Arc<dyn Provider>) {
        self.providers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, provider);
    }

    /// Return the cached provider for `key`, building it with `build` on first use.
    ///
    /// Concurrent first requests may both run `build`; the first one stored wins
    /// and every caller gets that instance.
    pub fn get_or_create<F>(&self, key: ModelProvider, build: F) -> Result<Arc<dyn Provider>>
    where
        F: FnOnce() -> Result<Arc<dyn Provider>>,
    {
        if let Some(existing) = self.get(key) {
            return Ok(existing);
        }

        let built = build()?;
        let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
        let provider = providers.entry(key).or_insert(built).clone();
        info!(provider = %key, "Model provider initialized");
        Ok(provider)
    }

    /// Keys currently cached.
    pub fn keys(&self) -> Vec<ModelProvider> {
        let mut keys: Vec<_> = self
            .providers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        keys.sort_by_key(|k| k.key());
        keys
    }
}

/// Build a provider for `key` from configuration.
pub fn build_provider(config: &AppConfig, key: ModelProvider) -> Result<Arc<dyn Provider>> {
    let api_key = config.provider_api_key(key).ok_or_else(|| {
        Error::Provider(ProviderError::NotConfigured(format!(
            "no API key for '{key}'. Set it in config.toml or via environment"
        )))
    })?;
    let base_url = config.provider_api_url(key);

    debug!(provider = %key, custom_url = base_url.is_some(), "Building model provider");

    let provider: Arc<dyn Provider> = match key {
        ModelProvider::Anthropic => {
            let mut p = AnthropicProvider::new(api_key);
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        ModelProvider::OpenAi => match base_url {
            Some(url) => Arc::new(OpenAiCompatProvider::new("openai", url, api_key)),
            None => Arc::new(OpenAiCompatProvider::openai(api_key)),
        },
    };

    Ok(provider)
}

/// A chat backend paired with the model name to request from it.
#[derive(Clone)]
pub struct ModelHandle {
    pub provider: Arc<dyn Provider>,
    pub model: String,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

/// Turns a per-turn provider key into a ready model.
pub trait ModelResolver: Send + Sync {
    /// `None` selects the configured default. Unknown keys are
    /// `Error::UnsupportedProvider`.
    fn resolve(&self, key: Option<&str>) -> Result<ModelHandle>;
}

/// Resolves models from application config through a [`ProviderRegistry`].
pub struct ConfiguredModels {
    config: Arc<AppConfig>,
    registry: Arc<ProviderRegistry>,
}

impl ConfiguredModels {
    /// Resolve through the process-wide registry.
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self::with_registry(config, ProviderRegistry::global())
    }

    pub fn with_registry(config: Arc<AppConfig>, registry: Arc<ProviderRegistry>) -> Self {
        Self { config, registry }
    }
}

impl ModelResolver for ConfiguredModels {
    fn resolve(&self, key: Option<&str>) -> Result<ModelHandle> {
        let selected = self.config.resolve_model_provider(key)?;
        let provider = self
            .registry
            .get_or_create(selected, || build_provider(&self.config, selected))?;

        Ok(ModelHandle {
            provider,
            model: self.config.provider_model(selected),
        })
    }
}
