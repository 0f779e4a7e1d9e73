//! End-to-end tests for the shopping assistant.
//!
//! These drive whole conversations through `ShoppingAgent` with the real
//! provider registry, tool registry, demo catalog and profile generator.
//! Only the language model is scripted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use shopassist_agent::{
    AgentSettings, NO_RESULTS_MESSAGE, PERSONALIZATION_QUESTION, ShoppingAgent, TurnConfig,
};
use shopassist_config::{AppConfig, ModelProvider};
use shopassist_core::error::{Error, ProviderError};
use shopassist_core::event::{DomainEvent, EventBus};
use shopassist_core::message::{Message, MessageToolCall, Role};
use shopassist_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use shopassist_core::state::AgentState;
use shopassist_providers::{ConfiguredModels, ProviderRegistry};
use shopassist_tools::{FakeProfileGenerator, ProfileSource, StaticCatalog, default_registry};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    name: &'static str,
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(name: &'static str, responses: Vec<ProviderResponse>) -> Self {
        Self {
            name,
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| panic!("ScriptedProvider exhausted after {} calls", self.calls())))
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tool_calls("", tool_calls),
        usage: None,
        model: "mock".into(),
    }
}

fn search_call(id: &str, query: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: "search".to_string(),
        arguments: serde_json::to_string(&serde_json::json!({"query": query, "items": 3})).unwrap(),
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────

/// An agent wired like `ShoppingAgent::from_config`, with scripted models
/// pre-registered so nothing goes over the network.
fn agent_with(models: &[(ModelProvider, Arc<ScriptedProvider>)]) -> ShoppingAgent {
    let registry = Arc::new(ProviderRegistry::new());
    for (key, provider) in models {
        registry.insert(*key, provider.clone());
    }
    let config = Arc::new(AppConfig::default());
    let profiles: Arc<dyn ProfileSource> = Arc::new(FakeProfileGenerator);
    let tools = Arc::new(default_registry(
        Arc::new(StaticCatalog::demo()),
        profiles.clone(),
    ));
    let settings = AgentSettings::from(config.as_ref());

    ShoppingAgent::new(
        Arc::new(ConfiguredModels::with_registry(config, registry)),
        tools,
        profiles,
        settings,
    )
}

fn anthropic(responses: Vec<ProviderResponse>) -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::new("anthropic", responses))
}

// ── E2E: personalization flow ────────────────────────────────────────────

#[tokio::test]
async fn e2e_search_then_yes_gives_personalized_answer() {
    let provider = anthropic(vec![
        tool_response(vec![search_call("call_1", "robot vacuum")]),
        text_response("Based on your interests, the Roborock S8 is a great fit."),
    ]);
    let agent = agent_with(&[(ModelProvider::Anthropic, provider.clone())]);
    let config = TurnConfig::new();

    let first = agent
        .run_turn(&AgentState::new(), "I need a robot vacuum", &config)
        .await
        .expect("first turn should succeed");

    assert!(first.awaiting_answer);
    assert_eq!(first.reply(), PERSONALIZATION_QUESTION);
    let output = first
        .state
        .history()
        .tool_output("call_1")
        .expect("search output recorded");
    assert!(!output.is_error);
    assert!(output.content.contains("Roborock S8 Robot Vacuum"));

    let second = agent
        .run_turn(&first.state, "yes", &config)
        .await
        .expect("second turn should succeed");

    assert_eq!(
        second.reply(),
        "Based on your interests, the Roborock S8 is a great fit."
    );
    assert!(!second.awaiting_answer);

    let profile = second.state.user_profile().expect("profile stored");
    assert!((23..=75).contains(&profile.age));
    assert!((2..=5).contains(&profile.interests.len()));

    // The synthesis prompt is a single user message carrying profile and results
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let prompt = &requests[1].messages;
    assert_eq!(prompt.len(), 1);
    assert_eq!(prompt[0].role, Role::User);
    assert!(prompt[0].content.contains(&profile.occupation));
    assert!(prompt[0].content.contains("Roborock S8 Robot Vacuum"));
    assert!(requests[1].tools.is_empty());
}

#[tokio::test]
async fn e2e_search_then_no_lists_products() {
    let provider = anthropic(vec![tool_response(vec![search_call(
        "call_1",
        "robot vacuum",
    )])]);
    let agent = agent_with(&[(ModelProvider::Anthropic, provider.clone())]);
    let config = TurnConfig::new();

    let first = agent
        .run_turn(&AgentState::new(), "I need a robot vacuum", &config)
        .await
        .unwrap();
    let second = agent.run_turn(&first.state, "No", &config).await.unwrap();

    let reply = second.reply();
    assert!(reply.starts_with("Here are the products I found:"));
    assert!(reply.contains("- Roborock S8 Robot Vacuum"));
    assert!(reply.contains("  Price: 5990.00"));
    assert!(reply.contains("  Category: Home Appliances > Robot vacuums"));
    assert!(second.state.user_profile().is_none());

    // The listing is formatted locally, the model is not consulted again
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn e2e_search_without_matches_reports_no_results() {
    let provider = anthropic(vec![tool_response(vec![search_call(
        "call_1",
        "submarine",
    )])]);
    let agent = agent_with(&[(ModelProvider::Anthropic, provider.clone())]);
    let config = TurnConfig::new();

    let first = agent
        .run_turn(&AgentState::new(), "do you sell submarines?", &config)
        .await
        .unwrap();
    assert!(first.awaiting_answer);

    let second = agent.run_turn(&first.state, "yes", &config).await.unwrap();

    assert_eq!(second.reply(), NO_RESULTS_MESSAGE);
    assert!(second.state.user_profile().is_none());
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn e2e_direct_answer_without_tools() {
    let provider = anthropic(vec![text_response("We offer free delivery over 500 kr.")]);
    let agent = agent_with(&[(ModelProvider::Anthropic, provider.clone())]);

    let outcome = agent
        .run_turn(&AgentState::new(), "is delivery free?", &TurnConfig::new())
        .await
        .unwrap();

    assert_eq!(outcome.reply(), "We offer free delivery over 500 kr.");
    assert!(!outcome.awaiting_answer);
    assert!(!outcome.state.asked_personalization());
    assert_eq!(outcome.state.history().len(), 2);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn e2e_later_searches_run_without_asking_again() {
    let provider = anthropic(vec![
        tool_response(vec![search_call("call_1", "robot vacuum")]),
        tool_response(vec![search_call("call_2", "coffee")]),
        text_response("The Philips 3300 makes great espresso."),
    ]);
    let agent = agent_with(&[(ModelProvider::Anthropic, provider.clone())]);
    let config = TurnConfig::new();

    let first = agent
        .run_turn(&AgentState::new(), "robot vacuum please", &config)
        .await
        .unwrap();
    let second = agent.run_turn(&first.state, "no", &config).await.unwrap();
    let third = agent
        .run_turn(&second.state, "and a coffee machine?", &config)
        .await
        .unwrap();

    assert_eq!(third.reply(), "The Philips 3300 makes great espresso.");
    assert!(!third.awaiting_answer);
    let questions = third
        .state
        .history()
        .iter()
        .filter(|m| m.content == PERSONALIZATION_QUESTION)
        .count();
    assert_eq!(questions, 1);
    let coffee = third.state.history().tool_output("call_2").unwrap();
    assert!(coffee.content.contains("Philips Series 3300"));
    assert_eq!(provider.calls(), 3);
}

// ── E2E: provider selection ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_turn_config_selects_provider() {
    let claude = anthropic(vec![]);
    let gpt = Arc::new(ScriptedProvider::new(
        "openai",
        vec![text_response("Hello from the other model.")],
    ));
    let agent = agent_with(&[
        (ModelProvider::Anthropic, claude.clone()),
        (ModelProvider::OpenAi, gpt.clone()),
    ]);

    let outcome = agent
        .run_turn(
            &AgentState::new(),
            "hi",
            &TurnConfig::new().with_model_provider("openai"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.reply(), "Hello from the other model.");
    assert_eq!(gpt.calls(), 1);
    assert_eq!(gpt.requests()[0].model, "gpt-4o");
    assert_eq!(claude.calls(), 0);
}

#[tokio::test]
async fn e2e_unsupported_provider_rejects_turn() {
    let provider = anthropic(vec![]);
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let agent =
        agent_with(&[(ModelProvider::Anthropic, provider.clone())]).with_event_bus(events);
    let state = AgentState::with_user_message("earlier message");

    let err = agent
        .run_turn(
            &state,
            "find a tv",
            &TurnConfig::new().with_model_provider("gemini"),
        )
        .await
        .unwrap_err();

    match err {
        Error::UnsupportedProvider { name } => assert_eq!(name, "gemini"),
        other => panic!("expected UnsupportedProvider, got {other:?}"),
    }
    assert_eq!(provider.calls(), 0);
    assert_eq!(state.history().len(), 1);

    match rx.recv().await.unwrap().as_ref() {
        DomainEvent::ErrorOccurred { context, .. } => assert_eq!(context, "resolve model"),
        other => panic!("unexpected event: {other:?}"),
    }
}

// ── E2E: configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_config_file_drives_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
model_provider = "openai"
retailer_name = "Power"
max_tool_iterations = 3

[providers.openai]
model = "gpt-4o-mini"
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(
        config.resolve_model_provider(None).unwrap(),
        ModelProvider::OpenAi
    );
    assert_eq!(config.provider_model(ModelProvider::OpenAi), "gpt-4o-mini");

    let settings = AgentSettings::from(&config);
    assert_eq!(settings.retailer_name, "Power");
    assert_eq!(settings.max_tool_iterations, 3);
}
