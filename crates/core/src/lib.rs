//! # shopassist core
//!
//! Domain types, traits, and error definitions for the shopassist shopping agent.
//! This crate has **no network dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The language model and the tools are traits here. Implementations live in
//! their respective crates, so the turn controller can be driven entirely by
//! test doubles.

pub mod catalog;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod state;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use catalog::{Product, Purchase, UserProfile};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{History, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use state::{AgentState, StateUpdate};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
