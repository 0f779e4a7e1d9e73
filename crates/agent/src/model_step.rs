//! The model step: one call to the language model over the full conversation.

use chrono::Utc;
use shopassist_core::error::Result;
use shopassist_core::event::{DomainEvent, EventBus};
use shopassist_core::message::{Message, Role};
use shopassist_core::provider::{ProviderRequest, ToolDefinition};
use shopassist_core::state::{AgentState, StateUpdate};
use shopassist_providers::ModelHandle;
use tracing::debug;

/// System instruction placed before the conversation on every model step.
pub fn system_prompt(retailer: &str) -> String {
    format!(
        "You are a helpful shopping assistant at {retailer}, an electronics retailer. \
         Use the search tool to find products that match what the customer is looking for, \
         and answer in a friendly, concise way."
    )
}

pub struct ModelStep<'a> {
    pub model: &'a ModelHandle,
    pub tools: &'a [ToolDefinition],
    pub system_prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub events: &'a EventBus,
    pub conversation_id: &'a str,
}

impl ModelStep<'_> {
    /// Ask the model for the next assistant message. The update appends
    /// exactly that message and touches nothing else.
    pub async fn run(&self, state: &AgentState) -> Result<StateUpdate> {
        let mut messages = Vec::with_capacity(state.history().len() + 1);
        messages.push(Message::system(self.system_prompt));
        messages.extend(state.history().iter().cloned());

        let request = ProviderRequest {
            model: self.model.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.tools.to_vec(),
        };

        debug!(
            conversation_id = self.conversation_id,
            provider = self.model.provider.name(),
            model = %self.model.model,
            history = state.history().len(),
            "Calling model"
        );

        let response = self.model.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            self.events.publish(DomainEvent::ResponseGenerated {
                conversation_id: self.conversation_id.to_string(),
                model: response.model.clone(),
                tokens_used: usage.total_tokens,
                timestamp: Utc::now(),
            });
        }

        let mut message = response.message;
        message.role = Role::Assistant;
        Ok(StateUpdate::new().message(message))
    }
}
