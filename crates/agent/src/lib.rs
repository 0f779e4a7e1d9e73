//! The turn controller: the heart of shopassist.
//!
//! Each user message runs one turn:
//!
//! 1. **Model step**: the model sees the system prompt and the conversation
//! 2. **Route**: tool calls on a first search interrupt with the
//!    personalization question; later tool calls are executed and the model
//!    is consulted again; a plain answer ends the turn
//! 3. **Synthesize**: the turn after the question, the shopper's yes/no
//!    answer picks a personalized ranking or a plain listing
//!
//! The loop is capped at a fixed number of model steps per turn.

pub mod model_step;
pub mod router;
pub mod synthesizer;
pub mod tool_node;
pub mod turn;

#[cfg(test)]
mod test_helpers;

pub use router::{Route, route};
pub use synthesizer::{NO_RESULTS_MESSAGE, SearchResults, Synthesizer, format_listing};
pub use turn::{
    AgentSettings, MAX_ITERATIONS_MESSAGE, PERSONALIZATION_QUESTION, ShoppingAgent, TurnConfig,
    TurnOutcome,
};
