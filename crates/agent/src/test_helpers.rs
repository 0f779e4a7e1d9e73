//! Shared test doubles for the turn controller tests.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use shopassist_config::ModelProvider;
use shopassist_core::catalog::{Product, Purchase, UserProfile};
use shopassist_core::error::{Error, ProviderError, ToolError};
use shopassist_core::message::{Message, MessageToolCall};
use shopassist_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use shopassist_providers::{ModelHandle, ModelResolver};
use shopassist_tools::ProfileSource;

/// A provider that replays scripted responses and records every request.
///
/// Panics if called more often than it has responses.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose first call fails with a network error.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(ProviderError::Network(
                "connection reset".into(),
            ))])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no response for call #{call}"))
    }
}

/// Resolves every supported key to the same scripted provider.
pub struct FixedModels {
    pub provider: Arc<ScriptedProvider>,
}

impl ModelResolver for FixedModels {
    fn resolve(&self, key: Option<&str>) -> shopassist_core::Result<ModelHandle> {
        let selected = ModelProvider::resolve(key)?;
        Ok(ModelHandle {
            provider: self.provider.clone(),
            model: selected.default_model().to_string(),
        })
    }
}

/// A profile source that always returns the same profile and counts lookups.
pub struct FixedProfile {
    profile: UserProfile,
    calls: Mutex<usize>,
}

impl FixedProfile {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ProfileSource for FixedProfile {
    async fn find_user(&self) -> Result<UserProfile, ToolError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.profile.clone())
    }
}

pub fn handle(provider: Arc<ScriptedProvider>) -> ModelHandle {
    ModelHandle {
        provider,
        model: "mock-model".into(),
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response carrying tool calls.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tool_calls("", tool_calls),
        usage: None,
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

pub fn sample_products() -> Vec<Product> {
    vec![
        Product {
            title: "Roborock S8".into(),
            price: 5990.0,
            category: "Home Appliances".into(),
            subcategory: Some("Robot vacuums".into()),
            description: "Robot vacuum with LiDAR".into(),
            image_url: "https://img.example/s8.jpg".into(),
            link_url: "https://shop.example/s8".into(),
        },
        Product {
            title: "Dyson V15".into(),
            price: 7490.5,
            category: "Home Appliances".into(),
            subcategory: None,
            description: "Cordless stick vacuum".into(),
            image_url: "https://img.example/v15.jpg".into(),
            link_url: "https://shop.example/v15".into(),
        },
    ]
}

pub fn sample_profile() -> UserProfile {
    UserProfile {
        id: "user-1".into(),
        name: "Nora Berg".into(),
        email: None,
        age: 34,
        occupation: "Software Engineer".into(),
        interests: BTreeSet::from(["Gaming".to_string(), "Smart Home".to_string()]),
        purchase_history: vec![
            Purchase {
                name: "Robot Vacuum".into(),
                price: 299.99,
                actual_price: 289.5,
                purchase_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            },
            Purchase {
                name: "Smart Speaker".into(),
                price: 99.99,
                actual_price: 101.0,
                purchase_date: NaiveDate::from_ymd_opt(2023, 11, 20).unwrap(),
            },
        ],
        join_date: None,
    }
}

/// Assert `err` is an unsupported-provider error naming `key`.
pub fn assert_unsupported(err: &Error, key: &str) {
    match err {
        Error::UnsupportedProvider { name } => assert_eq!(name, key),
        other => panic!("expected UnsupportedProvider, got {other:?}"),
    }
}
