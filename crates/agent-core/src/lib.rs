//! # agent-core
//!
//! Provider-agnostic conversation machinery for tool-calling LLM agents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │   Turn      │  │    Tools    │  │   ChatProvider      │  │
//! │  │   Loop      │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ChatProvider` trait enables swapping between OpenRouter, OpenAI,
//! or any other OpenAI-compatible backend without changing agent logic.
//! The turn loop alternates between model reasoning and tool execution
//! until the model answers without requesting tools.

pub mod provider;
pub mod tool;
pub mod turn;
pub mod message;
pub mod error;
pub mod session;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{ChatProvider, Completion};
pub use session::Session;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
pub use turn::{Agent, AgentConfig, Turn};
