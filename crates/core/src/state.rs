//! Conversation state threaded through the turn controller.
//!
//! Nodes never mutate [`AgentState`] directly. Each returns a [`StateUpdate`]
//! and the controller folds it in with [`AgentState::apply`]:
//! the message list appends, every other field overwrites when present.

use serde::{Deserialize, Serialize};

use crate::catalog::UserProfile;
use crate::message::{History, Message};

/// The record a conversation carries from turn to turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    history: History,

    #[serde(default)]
    asked_personalization: bool,

    /// The last turn ended on the yes/no question; the next user message answers it.
    #[serde(default)]
    awaiting_answer: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_profile: Option<UserProfile>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with its first user message.
    pub fn with_user_message(content: impl Into<String>) -> Self {
        Self::new().apply(StateUpdate::new().message(Message::user(content)))
    }

    /// Fold a partial update into this state.
    pub fn apply(self, update: StateUpdate) -> Self {
        Self {
            history: self.history.append(update.messages),
            asked_personalization: update
                .asked_personalization
                .unwrap_or(self.asked_personalization),
            awaiting_answer: update.awaiting_answer.unwrap_or(self.awaiting_answer),
            user_profile: update.user_profile.or(self.user_profile),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    pub fn asked_personalization(&self) -> bool {
        self.asked_personalization
    }

    pub fn awaiting_answer(&self) -> bool {
        self.awaiting_answer
    }

    pub fn user_profile(&self) -> Option<&UserProfile> {
        self.user_profile.as_ref()
    }
}

/// A partial state change returned by one node.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    messages: Vec<Message>,
    asked_personalization: Option<bool>,
    awaiting_answer: Option<bool>,
    user_profile: Option<UserProfile>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Append several messages, in order.
    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Record that the personalization question has been asked.
    pub fn mark_asked_personalization(mut self) -> Self {
        self.asked_personalization = Some(true);
        self
    }

    pub fn awaiting_answer(mut self, awaiting: bool) -> Self {
        self.awaiting_answer = Some(awaiting);
        self
    }

    pub fn user_profile(mut self, profile: UserProfile) -> Self {
        self.user_profile = Some(profile);
        self
    }

    /// Messages this update appends.
    pub fn new_messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.asked_personalization.is_none()
            && self.awaiting_answer.is_none()
            && self.user_profile.is_none()
    }
}
