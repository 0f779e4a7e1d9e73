//! The turn driver.
//!
//! A turn starts from the caller's state plus one user message and walks the
//! node graph until a terminal node:
//!
//! ```text
//! Agent ──route──▶ Continue ──▶ Action ──▶ Agent
//!                  AskPersonalization ──▶ (turn ends, awaiting answer)
//!                  End ──▶ (turn ends)
//! awaiting answer ──▶ ProcessResults ──▶ (turn ends)
//! ```
//!
//! All work happens on a copy of the caller's state. On error nothing is
//! committed.

use std::sync::Arc;

use chrono::Utc;
use shopassist_config::{AppConfig, ModelProvider};
use shopassist_core::error::{Error, Result};
use shopassist_core::event::{DomainEvent, EventBus};
use shopassist_core::message::{Message, MessageToolCall, Role};
use shopassist_core::provider::ToolDefinition;
use shopassist_core::state::{AgentState, StateUpdate};
use shopassist_core::tool::ToolRegistry;
use shopassist_providers::{ConfiguredModels, ModelHandle, ModelResolver, build_provider};
use shopassist_tools::{FakeProfileGenerator, ProfileSource};
use tracing::{debug, info, warn};

use crate::model_step::{ModelStep, system_prompt};
use crate::router::{Route, route};
use crate::synthesizer::Synthesizer;
use crate::tool_node::execute_tools;

pub const PERSONALIZATION_QUESTION: &str =
    "Would you like personalized product recommendations? (yes/no)";

pub const MAX_ITERATIONS_MESSAGE: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// Agent settings taken from configuration.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub retailer_name: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Model steps allowed in one turn
    pub max_tool_iterations: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            retailer_name: "Elkjøp".into(),
            temperature: 0.0,
            max_tokens: Some(4096),
            max_tool_iterations: 25,
        }
    }
}

impl From<&AppConfig> for AgentSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            retailer_name: config.retailer_name.clone(),
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            max_tool_iterations: config.max_tool_iterations,
        }
    }
}

/// Per-turn options supplied by the caller.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Provider key (`anthropic`, `openai`); `None` uses the configured default.
    pub model_provider: Option<String>,
    /// Correlates logs and events across the turns of one conversation.
    pub conversation_id: String,
}

impl TurnConfig {
    pub fn new() -> Self {
        Self {
            model_provider: None,
            conversation_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_model_provider(mut self, key: impl Into<String>) -> Self {
        self.model_provider = Some(key.into());
        self
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// State to pass to the next turn
    pub state: AgentState,
    /// Assistant messages appended during this turn, in order
    pub replies: Vec<Message>,
    /// The turn ended on the personalization question
    pub awaiting_answer: bool,
}

impl TurnOutcome {
    /// Text of the last assistant message of the turn.
    pub fn reply(&self) -> &str {
        self.replies.last().map(|m| m.content.as_str()).unwrap_or_default()
    }
}

/// Nodes of the turn graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Agent,
    Action,
    AskPersonalization,
    ProcessResults,
}

/// Where each route leads. `None` ends the turn.
fn dispatch(route: Route) -> Option<Node> {
    match route {
        Route::Continue => Some(Node::Action),
        Route::AskPersonalization => Some(Node::AskPersonalization),
        Route::End => None,
    }
}

/// The shopping assistant.
pub struct ShoppingAgent {
    models: Arc<dyn ModelResolver>,
    tools: Arc<ToolRegistry>,
    definitions: Vec<ToolDefinition>,
    profiles: Arc<dyn ProfileSource>,
    settings: AgentSettings,
    system_prompt: String,
    events: Arc<EventBus>,
}

impl ShoppingAgent {
    pub fn new(
        models: Arc<dyn ModelResolver>,
        tools: Arc<ToolRegistry>,
        profiles: Arc<dyn ProfileSource>,
        settings: AgentSettings,
    ) -> Self {
        let system_prompt = system_prompt(&settings.retailer_name);
        let definitions = tools.definitions();
        Self {
            models,
            tools,
            definitions,
            profiles,
            settings,
            system_prompt,
            events: Arc::new(EventBus::default()),
        }
    }

    /// Wire the agent from application config: configured model backends,
    /// the configured search backend and generated shopper profiles.
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let embedder = config
            .search
            .endpoint
            .as_ref()
            .and_then(|_| build_provider(&config, ModelProvider::OpenAi).ok());
        let backend = shopassist_tools::search_backend(&config.search, embedder);
        let profiles: Arc<dyn ProfileSource> = Arc::new(FakeProfileGenerator);
        let tools = Arc::new(shopassist_tools::default_registry(backend, profiles.clone()));
        let settings = AgentSettings::from(config.as_ref());

        Self::new(Arc::new(ConfiguredModels::new(config)), tools, profiles, settings)
    }

    /// Share an event bus with observers.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Process one user message against `state`.
    ///
    /// If the previous turn ended on the personalization question,
    /// `user_input` is taken as the answer and goes straight to the
    /// synthesizer. Otherwise the model is consulted.
    pub async fn run_turn(
        &self,
        state: &AgentState,
        user_input: &str,
        config: &TurnConfig,
    ) -> Result<TurnOutcome> {
        let conversation_id = config.conversation_id.as_str();
        let model = self
            .models
            .resolve(config.model_provider.as_deref())
            .inspect_err(|e| self.report("resolve model", e))?;

        info!(
            conversation_id,
            provider = model.provider.name(),
            model = %model.model,
            awaiting_answer = state.awaiting_answer(),
            "Processing turn"
        );

        let start = state.history().len();
        let mut state = state
            .clone()
            .apply(StateUpdate::new().message(Message::user(user_input)));

        let mut next = Some(if state.awaiting_answer() {
            Node::ProcessResults
        } else {
            Node::Agent
        });
        let mut iteration = 0;

        while let Some(node) = next {
            next = match node {
                Node::Agent => {
                    if iteration >= self.settings.max_tool_iterations {
                        warn!(conversation_id, iteration, "Max tool iterations reached");
                        state = state.apply(
                            StateUpdate::new().message(Message::assistant(MAX_ITERATIONS_MESSAGE)),
                        );
                        None
                    } else {
                        iteration += 1;
                        debug!(conversation_id, iteration, "Agent step");
                        let update = self
                            .model_step(&model, conversation_id)
                            .run(&state)
                            .await
                            .inspect_err(|e| self.report("model step", e))?;
                        state = state.apply(update);
                        self.decide(&state, conversation_id)
                    }
                }
                Node::Action => {
                    state = self.resolve_pending(state, conversation_id).await;
                    Some(Node::Agent)
                }
                Node::AskPersonalization => {
                    state = self.resolve_pending(state, conversation_id).await;
                    state = state.apply(
                        StateUpdate::new()
                            .message(Message::assistant(PERSONALIZATION_QUESTION))
                            .mark_asked_personalization()
                            .awaiting_answer(true),
                    );
                    info!(conversation_id, "Asked about personalization");
                    self.events.publish(DomainEvent::PersonalizationAsked {
                        conversation_id: conversation_id.to_string(),
                        timestamp: Utc::now(),
                    });
                    None
                }
                Node::ProcessResults => {
                    let synthesis = Synthesizer {
                        model: &model,
                        profiles: self.profiles.as_ref(),
                        temperature: self.settings.temperature,
                        max_tokens: self.settings.max_tokens,
                    }
                    .synthesize(&state)
                    .await
                    .inspect_err(|e| self.report("synthesize", e))?;

                    info!(
                        conversation_id,
                        personalized = synthesis.personalized,
                        products = synthesis.product_count,
                        "Results synthesized"
                    );
                    self.events.publish(DomainEvent::ResultsSynthesized {
                        conversation_id: conversation_id.to_string(),
                        personalized: synthesis.personalized,
                        product_count: synthesis.product_count,
                        timestamp: Utc::now(),
                    });
                    state = state.apply(synthesis.update);
                    None
                }
            };
        }

        let replies: Vec<Message> = state.history().messages()[start..]
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .cloned()
            .collect();

        Ok(TurnOutcome {
            awaiting_answer: state.awaiting_answer(),
            state,
            replies,
        })
    }

    fn model_step<'a>(&'a self, model: &'a ModelHandle, conversation_id: &'a str) -> ModelStep<'a> {
        ModelStep {
            model,
            tools: &self.definitions,
            system_prompt: &self.system_prompt,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            events: &self.events,
            conversation_id,
        }
    }

    /// Route the state and map the route onto the next node.
    fn decide(&self, state: &AgentState, conversation_id: &str) -> Option<Node> {
        let decided = route(state);
        debug!(conversation_id, route = %decided, "Route decided");
        self.events.publish(DomainEvent::RouteDecided {
            conversation_id: conversation_id.to_string(),
            route: decided.to_string(),
            timestamp: Utc::now(),
        });
        dispatch(decided)
    }

    /// Execute the unresolved tool calls of the last message.
    async fn resolve_pending(&self, state: AgentState, conversation_id: &str) -> AgentState {
        let calls: Vec<MessageToolCall> = state
            .history()
            .pending_tool_calls()
            .into_iter()
            .cloned()
            .collect();
        if calls.is_empty() {
            return state;
        }

        debug!(conversation_id, count = calls.len(), "Executing tool calls");
        let results = execute_tools(&self.tools, &self.events, &calls).await;
        state.apply(StateUpdate::new().messages(results))
    }

    fn report(&self, context: &str, error: &Error) {
        warn!(context, error = %error, "Turn failed");
        self.events.publish(DomainEvent::ErrorOccurred {
            context: context.to_string(),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}
