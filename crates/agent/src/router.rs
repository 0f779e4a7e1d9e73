//! Routing after each model step.
//!
//! Only the last message and the personalization flag are consulted.
//! Rules, first match wins:
//!
//! 1. pending tool calls, question not yet asked → [`Route::AskPersonalization`]
//! 2. pending tool calls → [`Route::Continue`]
//! 3. otherwise → [`Route::End`]

use std::fmt;

use serde::{Deserialize, Serialize};
use shopassist_core::AgentState;

/// Where the turn goes after the model has spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    /// Execute the pending tool calls and return to the model.
    Continue,
    /// Interrupt the turn with the yes/no personalization question.
    AskPersonalization,
    /// The model answered; the turn is over.
    End,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::AskPersonalization => "askPersonalization",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide the next step for `state`.
pub fn route(state: &AgentState) -> Route {
    let pending = !state.history().pending_tool_calls().is_empty();

    match (pending, state.asked_personalization()) {
        (true, false) => Route::AskPersonalization,
        (true, true) => Route::Continue,
        (false, _) => Route::End,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopassist_core::{Message, MessageToolCall, StateUpdate};

    fn search_call(id: &str) -> MessageToolCall {
        MessageToolCall {
            id: id.into(),
            name: "search".into(),
            arguments: r#"{"query":"vacuum"}"#.into(),
        }
    }

    fn with_tool_call(asked: bool) -> AgentState {
        let mut update = StateUpdate::new()
            .message(Message::assistant_with_tool_calls("", vec![search_call("call_1")]));
        if asked {
            update = update.mark_asked_personalization();
        }
        AgentState::with_user_message("find me a vacuum").apply(update)
    }

    #[test]
    fn no_tool_calls_ends() {
        for asked in [false, true] {
            let mut update = StateUpdate::new().message(Message::assistant("Hello!"));
            if asked {
                update = update.mark_asked_personalization();
            }
            let state = AgentState::with_user_message("hi").apply(update);
            assert_eq!(route(&state), Route::End);
        }
    }

    #[test]
    fn empty_history_ends() {
        assert_eq!(route(&AgentState::new()), Route::End);
    }

    #[test]
    fn first_tool_call_asks_for_personalization() {
        assert_eq!(route(&with_tool_call(false)), Route::AskPersonalization);
    }

    #[test]
    fn tool_call_after_asking_continues() {
        assert_eq!(route(&with_tool_call(true)), Route::Continue);
    }

    #[test]
    fn asked_only_once_per_conversation() {
        let state = with_tool_call(false);
        assert_eq!(route(&state), Route::AskPersonalization);

        let state = state
            .apply(StateUpdate::new().mark_asked_personalization())
            .apply(StateUpdate::new().message(Message::user("and a tv?")))
            .apply(StateUpdate::new().message(Message::assistant_with_tool_calls(
                "",
                vec![search_call("call_2")],
            )));
        assert_eq!(route(&state), Route::Continue);
    }

    #[test]
    fn only_last_message_counts() {
        let state = with_tool_call(false)
            .apply(StateUpdate::new().message(Message::tool_result("call_1", "[]")))
            .apply(StateUpdate::new().message(Message::assistant("Nothing found.")));
        assert_eq!(route(&state), Route::End);
    }

    #[test]
    fn route_labels() {
        assert_eq!(Route::AskPersonalization.to_string(), "askPersonalization");
        assert_eq!(
            serde_json::to_string(&Route::Continue).unwrap(),
            "\"continue\""
        );
    }
}
